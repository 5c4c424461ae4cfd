// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod builder;
pub mod cpu;
pub mod soc;

pub use builder::{build_registry, signal_table};
pub use cpu::CpuHarness;
pub use soc::SystemHarness;

/// Clock pulses applied while reset is held.
pub const RESET_CYCLES: usize = 5;
