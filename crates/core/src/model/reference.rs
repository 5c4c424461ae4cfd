// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Behavioral multi-cycle RV32I core.
//!
//! Stands in for an externally compiled design: it talks to the harness only
//! through its [`MemPort`]s and debug signals, updating state on rising clock
//! edges. Instruction fetches go through a one-line buffer, data accesses are
//! read-modify-write over whole lines.

use super::{ClockedModel, CpuModel, DebugSignals, MemOp, MemPort, LINE_BYTES, LINE_WORDS};
use crate::decoder::{decode_rv32, Instruction, BUBBLE};
use crate::decoder::riscv::MemWidth;
use crate::{Addr, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fetch,
    FetchReq,
    FetchWait,
    DataReq,
    DataWait,
    Halted,
}

#[derive(Debug, Clone, Copy)]
enum AccessKind {
    Load { rd: u8, width: MemWidth, signed: bool },
    Store { width: MemWidth, value: Word },
}

#[derive(Debug, Clone, Copy)]
struct DataAccess {
    inst: Word,
    ea: Addr,
    kind: AccessKind,
    writing_back: bool,
}

#[derive(Debug)]
pub struct ReferenceCore {
    clock: bool,
    last_clock: bool,
    reset: bool,
    reset_vector: Addr,
    pc: Addr,
    regs: [Word; 32],
    state: State,
    line: Option<(Addr, [Word; LINE_WORDS])>,
    access: Option<DataAccess>,
    imem: MemPort,
    dmem: MemPort,
    debug: DebugSignals,
}

fn line_of(addr: Addr) -> Addr {
    addr & !(LINE_BYTES - 1)
}

impl ReferenceCore {
    pub fn new(reset_vector: Addr) -> Self {
        let mut core = Self {
            clock: false,
            last_clock: false,
            reset: false,
            reset_vector,
            pc: reset_vector,
            regs: [0; 32],
            state: State::Fetch,
            line: None,
            access: None,
            imem: MemPort::default(),
            dmem: MemPort::default(),
            debug: DebugSignals::default(),
        };
        core.reset_state();
        core
    }

    pub fn pc(&self) -> Addr {
        self.pc
    }

    pub fn reg(&self, n: u8) -> Word {
        self.regs[(n & 0x1F) as usize]
    }

    pub fn halted(&self) -> bool {
        self.state == State::Halted
    }

    fn reset_state(&mut self) {
        self.pc = self.reset_vector;
        self.regs = [0; 32];
        self.state = State::Fetch;
        self.line = None;
        self.access = None;
        for port in [&mut self.imem, &mut self.dmem] {
            port.req_valid = false;
            port.req_op = MemOp::Read;
            port.req_data = [0; LINE_WORDS];
            port.resp_ready = true;
        }
        self.debug = DebugSignals {
            pc: self.reset_vector,
            ..DebugSignals::default()
        };
    }

    fn clear_pulses(&mut self) {
        let d = &mut self.debug;
        d.reg_addr = 0;
        d.reg_data = 0;
        d.reg_we = false;
        d.icache_access = false;
        d.icache_miss = false;
        d.dcache_access = false;
        d.dcache_miss = false;
        d.if_instr = BUBBLE;
        d.id_instr = BUBBLE;
        d.ex_instr = BUBBLE;
        d.mem_instr = BUBBLE;
        d.wb_instr = BUBBLE;
        d.branch_taken = false;
    }

    fn halt(&mut self, why: &str) {
        tracing::debug!("core halted at {:#010x}: {}", self.pc, why);
        self.state = State::Halted;
    }

    fn read_reg(&self, n: u8) -> Word {
        self.regs[n as usize]
    }

    fn retire(&mut self, inst: Word, rd: Option<(u8, Word)>, next_pc: Addr) {
        if let Some((rd, value)) = rd.filter(|(rd, _)| *rd != 0) {
            self.regs[rd as usize] = value;
            self.debug.reg_addr = rd;
            self.debug.reg_data = value;
            self.debug.reg_we = true;
        }
        self.debug.wb_instr = inst;
        self.pc = next_pc;
        self.state = State::Fetch;
    }

    fn take_branch(&mut self, target: Addr) {
        self.debug.branch_taken = true;
        self.debug.branch_source = self.pc;
        self.debug.branch_target = target;
    }

    fn posedge(&mut self) {
        self.clear_pulses();
        match self.state {
            State::Halted => {}
            State::Fetch => self.fetch(),
            State::FetchReq => {
                if self.imem.req_ready {
                    self.imem.req_valid = false;
                    self.state = State::FetchWait;
                }
            }
            State::FetchWait => {
                if self.imem.resp_valid {
                    let line = line_of(self.pc);
                    self.line = Some((line, self.imem.resp_data));
                    let inst = self.imem.resp_data[((self.pc - line) / 4) as usize];
                    self.execute(inst);
                }
            }
            State::DataReq => {
                if self.dmem.req_ready {
                    self.dmem.req_valid = false;
                    self.state = State::DataWait;
                }
                if let Some(a) = self.access {
                    self.debug.mem_instr = a.inst;
                }
            }
            State::DataWait => {
                if let Some(a) = self.access {
                    self.debug.mem_instr = a.inst;
                }
                if self.dmem.resp_valid {
                    self.complete_access();
                }
            }
        }
    }

    fn fetch(&mut self) {
        if self.pc % 4 != 0 {
            self.halt("misaligned fetch");
            return;
        }
        let line_addr = line_of(self.pc);
        self.debug.icache_access = true;
        match self.line {
            Some((addr, words)) if addr == line_addr => {
                let inst = words[((self.pc - addr) / 4) as usize];
                self.execute(inst);
            }
            _ => {
                self.debug.icache_miss = true;
                self.imem.req_valid = true;
                self.imem.req_addr = line_addr;
                self.imem.req_op = MemOp::Read;
                self.state = State::FetchReq;
            }
        }
    }

    fn execute(&mut self, inst: Word) {
        let pc = self.pc;
        self.debug.pc = pc;
        self.debug.instr = inst;
        self.debug.if_instr = inst;
        self.debug.id_instr = inst;
        self.debug.ex_instr = inst;
        let next = pc.wrapping_add(4);

        match decode_rv32(inst) {
            Instruction::Lui { rd, imm } => self.retire(inst, Some((rd, imm)), next),
            Instruction::Auipc { rd, imm } => {
                self.retire(inst, Some((rd, pc.wrapping_add(imm))), next)
            }
            Instruction::Jal { rd, offset } => {
                let target = pc.wrapping_add(offset as u32);
                self.take_branch(target);
                self.retire(inst, Some((rd, next)), target);
            }
            Instruction::Jalr { rd, rs1, offset } => {
                let target = self.read_reg(rs1).wrapping_add(offset as u32) & !1;
                self.take_branch(target);
                self.retire(inst, Some((rd, next)), target);
            }
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                offset,
            } => {
                let mut target = next;
                if cond.taken(self.read_reg(rs1), self.read_reg(rs2)) {
                    target = pc.wrapping_add(offset as u32);
                    self.take_branch(target);
                }
                self.retire(inst, None, target);
            }
            Instruction::Load {
                width,
                signed,
                rd,
                rs1,
                offset,
            } => {
                let ea = self.read_reg(rs1).wrapping_add(offset as u32);
                self.start_access(inst, ea, AccessKind::Load { rd, width, signed });
            }
            Instruction::Store {
                width,
                rs1,
                rs2,
                offset,
            } => {
                let ea = self.read_reg(rs1).wrapping_add(offset as u32);
                let value = self.read_reg(rs2);
                self.start_access(inst, ea, AccessKind::Store { width, value });
            }
            Instruction::OpImm { op, rd, rs1, imm } => {
                let v = op.apply(self.read_reg(rs1), imm as u32);
                self.retire(inst, Some((rd, v)), next);
            }
            Instruction::Op { op, rd, rs1, rs2 } => {
                let v = op.apply(self.read_reg(rs1), self.read_reg(rs2));
                self.retire(inst, Some((rd, v)), next);
            }
            Instruction::Fence => self.retire(inst, None, next),
            Instruction::Ebreak => {
                self.debug.wb_instr = inst;
                self.halt("ebreak");
            }
            other => {
                tracing::warn!("unsupported instruction {:#010x} ({}) at {:#010x}", inst, other, pc);
                self.halt("unsupported instruction");
            }
        }
    }

    fn start_access(&mut self, inst: Word, ea: Addr, kind: AccessKind) {
        let width = match kind {
            AccessKind::Load { width, .. } | AccessKind::Store { width, .. } => width,
        };
        if ea % width.bytes() != 0 {
            self.halt("misaligned data access");
            return;
        }
        self.access = Some(DataAccess {
            inst,
            ea,
            kind,
            writing_back: false,
        });
        self.debug.dcache_access = true;
        self.debug.dcache_miss = true;
        self.debug.mem_instr = inst;
        self.dmem.req_valid = true;
        self.dmem.req_addr = line_of(ea);
        self.dmem.req_op = MemOp::Read;
        self.state = State::DataReq;
    }

    fn complete_access(&mut self) {
        let Some(mut a) = self.access else {
            self.state = State::Fetch;
            return;
        };
        let next = self.pc.wrapping_add(4);
        let offset = a.ea - line_of(a.ea);
        let word = (offset / 4) as usize;
        let shift = (offset % 4) * 8;

        if a.writing_back {
            self.access = None;
            if self.line.is_some_and(|(addr, _)| addr == line_of(a.ea)) {
                self.line = None;
            }
            self.retire(a.inst, None, next);
            return;
        }

        let mut line = self.dmem.resp_data;
        match a.kind {
            AccessKind::Load { rd, width, signed } => {
                let raw = line[word] >> shift;
                let value = match (width, signed) {
                    (MemWidth::Byte, true) => raw as u8 as i8 as i32 as u32,
                    (MemWidth::Byte, false) => raw & 0xFF,
                    (MemWidth::Half, true) => raw as u16 as i16 as i32 as u32,
                    (MemWidth::Half, false) => raw & 0xFFFF,
                    (MemWidth::Word, _) => raw,
                };
                self.access = None;
                self.retire(a.inst, Some((rd, value)), next);
            }
            AccessKind::Store { width, value } => {
                let mask = match width {
                    MemWidth::Byte => 0xFFu32,
                    MemWidth::Half => 0xFFFF,
                    MemWidth::Word => 0xFFFF_FFFF,
                };
                line[word] = (line[word] & !(mask << shift)) | ((value & mask) << shift);
                a.writing_back = true;
                self.access = Some(a);
                self.dmem.req_valid = true;
                self.dmem.req_op = MemOp::Write;
                self.dmem.req_data = line;
                self.state = State::DataReq;
            }
        }
    }
}

impl ClockedModel for ReferenceCore {
    fn set_clock(&mut self, high: bool) {
        self.clock = high;
    }

    fn set_reset(&mut self, high: bool) {
        self.reset = high;
    }

    fn evaluate(&mut self) {
        let rising = self.clock && !self.last_clock;
        self.last_clock = self.clock;
        if !rising {
            return;
        }
        if self.reset {
            self.reset_state();
        } else {
            self.posedge();
        }
    }
}

impl CpuModel for ReferenceCore {
    fn imem(&mut self) -> &mut MemPort {
        &mut self.imem
    }

    fn dmem(&mut self) -> &mut MemPort {
        &mut self.dmem
    }

    fn debug(&self) -> DebugSignals {
        self.debug
    }
}
