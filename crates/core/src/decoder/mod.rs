// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod riscv;

pub use riscv::{decode_rv32, Instruction, BUBBLE, EBREAK};

/// Disassembles a raw instruction word for trace and log output.
pub fn disassemble(inst: u32) -> String {
    decode_rv32(inst).to_string()
}
