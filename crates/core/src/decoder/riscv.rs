// Tickbench - Cycle-Level RTL Testbench Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! RV32I base integer decoder and disassembler.

use std::fmt;

/// `ebreak`, the default breakpoint opcode.
pub const EBREAK: u32 = 0x0010_0073;
/// `addi x0, x0, 0`, which the pipeline also uses as its bubble.
pub const BUBBLE: u32 = 0x0000_0013;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    pub fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Sll => a << (b & 0x1F),
            AluOp::Slt => ((a as i32) < (b as i32)) as u32,
            AluOp::Sltu => (a < b) as u32,
            AluOp::Xor => a ^ b,
            AluOp::Srl => a >> (b & 0x1F),
            AluOp::Sra => ((a as i32) >> (b & 0x1F)) as u32,
            AluOp::Or => a | b,
            AluOp::And => a & b,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Sll => "sll",
            AluOp::Slt => "slt",
            AluOp::Sltu => "sltu",
            AluOp::Xor => "xor",
            AluOp::Srl => "srl",
            AluOp::Sra => "sra",
            AluOp::Or => "or",
            AluOp::And => "and",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BranchCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl BranchCond {
    pub fn taken(self, a: u32, b: u32) -> bool {
        match self {
            BranchCond::Eq => a == b,
            BranchCond::Ne => a != b,
            BranchCond::Lt => (a as i32) < (b as i32),
            BranchCond::Ge => (a as i32) >= (b as i32),
            BranchCond::Ltu => a < b,
            BranchCond::Geu => a >= b,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MemWidth {
    Byte,
    Half,
    Word,
}

impl MemWidth {
    pub fn bytes(self) -> u32 {
        match self {
            MemWidth::Byte => 1,
            MemWidth::Half => 2,
            MemWidth::Word => 4,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CsrOp {
    Rw,
    Rs,
    Rc,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    Lui { rd: u8, imm: u32 },
    Auipc { rd: u8, imm: u32 },
    Jal { rd: u8, offset: i32 },
    Jalr { rd: u8, rs1: u8, offset: i32 },
    Branch { cond: BranchCond, rs1: u8, rs2: u8, offset: i32 },
    Load { width: MemWidth, signed: bool, rd: u8, rs1: u8, offset: i32 },
    Store { width: MemWidth, rs1: u8, rs2: u8, offset: i32 },
    OpImm { op: AluOp, rd: u8, rs1: u8, imm: i32 },
    Op { op: AluOp, rd: u8, rs1: u8, rs2: u8 },
    Fence,
    Ecall,
    Ebreak,
    /// `src` is rs1, or the zero-extended immediate when `imm` is set.
    Csr { op: CsrOp, imm: bool, rd: u8, src: u8, csr: u16 },
    Unknown(u32),
}

fn imm_i(inst: u32) -> i32 {
    (inst as i32) >> 20
}

fn imm_s(inst: u32) -> i32 {
    (((inst & 0xFE00_0000) as i32) >> 20) | ((inst >> 7) & 0x1F) as i32
}

fn imm_b(inst: u32) -> i32 {
    (((inst & 0x8000_0000) as i32) >> 19)
        | ((inst & 0x80) << 4) as i32
        | ((inst >> 20) & 0x7E0) as i32
        | ((inst >> 7) & 0x1E) as i32
}

fn imm_j(inst: u32) -> i32 {
    (((inst & 0x8000_0000) as i32) >> 11)
        | (inst & 0x000F_F000) as i32
        | ((inst >> 9) & 0x800) as i32
        | ((inst >> 20) & 0x7FE) as i32
}

pub fn decode_rv32(inst: u32) -> Instruction {
    let rd = ((inst >> 7) & 0x1F) as u8;
    let funct3 = (inst >> 12) & 0x7;
    let rs1 = ((inst >> 15) & 0x1F) as u8;
    let rs2 = ((inst >> 20) & 0x1F) as u8;
    let funct7 = inst >> 25;

    match inst & 0x7F {
        0x37 => Instruction::Lui {
            rd,
            imm: inst & 0xFFFF_F000,
        },
        0x17 => Instruction::Auipc {
            rd,
            imm: inst & 0xFFFF_F000,
        },
        0x6F => Instruction::Jal {
            rd,
            offset: imm_j(inst),
        },
        0x67 if funct3 == 0 => Instruction::Jalr {
            rd,
            rs1,
            offset: imm_i(inst),
        },
        0x63 => {
            let cond = match funct3 {
                0 => BranchCond::Eq,
                1 => BranchCond::Ne,
                4 => BranchCond::Lt,
                5 => BranchCond::Ge,
                6 => BranchCond::Ltu,
                7 => BranchCond::Geu,
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Branch {
                cond,
                rs1,
                rs2,
                offset: imm_b(inst),
            }
        }
        0x03 => {
            let (width, signed) = match funct3 {
                0 => (MemWidth::Byte, true),
                1 => (MemWidth::Half, true),
                2 => (MemWidth::Word, true),
                4 => (MemWidth::Byte, false),
                5 => (MemWidth::Half, false),
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Load {
                width,
                signed,
                rd,
                rs1,
                offset: imm_i(inst),
            }
        }
        0x23 => {
            let width = match funct3 {
                0 => MemWidth::Byte,
                1 => MemWidth::Half,
                2 => MemWidth::Word,
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Store {
                width,
                rs1,
                rs2,
                offset: imm_s(inst),
            }
        }
        0x13 => {
            let imm = imm_i(inst);
            let op = match (funct3, funct7) {
                (0, _) => AluOp::Add,
                (2, _) => AluOp::Slt,
                // SLTIU still sign-extends its immediate before the unsigned compare.
                (3, _) => AluOp::Sltu,
                (4, _) => AluOp::Xor,
                (6, _) => AluOp::Or,
                (7, _) => AluOp::And,
                (1, 0x00) => AluOp::Sll,
                (5, 0x00) => AluOp::Srl,
                (5, 0x20) => AluOp::Sra,
                _ => return Instruction::Unknown(inst),
            };
            let imm = if matches!(op, AluOp::Sll | AluOp::Srl | AluOp::Sra) {
                imm & 0x1F
            } else {
                imm
            };
            Instruction::OpImm { op, rd, rs1, imm }
        }
        0x33 => {
            let op = match (funct3, funct7) {
                (0, 0x00) => AluOp::Add,
                (0, 0x20) => AluOp::Sub,
                (1, 0x00) => AluOp::Sll,
                (2, 0x00) => AluOp::Slt,
                (3, 0x00) => AluOp::Sltu,
                (4, 0x00) => AluOp::Xor,
                (5, 0x00) => AluOp::Srl,
                (5, 0x20) => AluOp::Sra,
                (6, 0x00) => AluOp::Or,
                (7, 0x00) => AluOp::And,
                _ => return Instruction::Unknown(inst),
            };
            Instruction::Op { op, rd, rs1, rs2 }
        }
        0x0F => Instruction::Fence,
        0x73 => {
            let csr = (inst >> 20) as u16;
            let op = match funct3 & 0x3 {
                1 => CsrOp::Rw,
                2 => CsrOp::Rs,
                3 => CsrOp::Rc,
                _ => {
                    return match inst {
                        0x0000_0073 => Instruction::Ecall,
                        EBREAK => Instruction::Ebreak,
                        _ => Instruction::Unknown(inst),
                    }
                }
            };
            Instruction::Csr {
                op,
                imm: funct3 & 0x4 != 0,
                rd,
                src: rs1,
                csr,
            }
        }
        _ => Instruction::Unknown(inst),
    }
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Lui { .. } => "lui",
            Instruction::Auipc { .. } => "auipc",
            Instruction::Jal { .. } => "jal",
            Instruction::Jalr { .. } => "jalr",
            Instruction::Branch { cond, .. } => match cond {
                BranchCond::Eq => "beq",
                BranchCond::Ne => "bne",
                BranchCond::Lt => "blt",
                BranchCond::Ge => "bge",
                BranchCond::Ltu => "bltu",
                BranchCond::Geu => "bgeu",
            },
            Instruction::Load { width, signed, .. } => match (width, signed) {
                (MemWidth::Byte, true) => "lb",
                (MemWidth::Half, true) => "lh",
                (MemWidth::Word, _) => "lw",
                (MemWidth::Byte, false) => "lbu",
                (MemWidth::Half, false) => "lhu",
            },
            Instruction::Store { width, .. } => match width {
                MemWidth::Byte => "sb",
                MemWidth::Half => "sh",
                MemWidth::Word => "sw",
            },
            Instruction::OpImm { op, .. } => match op {
                AluOp::Add => "addi",
                AluOp::Slt => "slti",
                AluOp::Sltu => "sltiu",
                AluOp::Xor => "xori",
                AluOp::Or => "ori",
                AluOp::And => "andi",
                AluOp::Sll => "slli",
                AluOp::Srl => "srli",
                AluOp::Sra => "srai",
                AluOp::Sub => "subi",
            },
            Instruction::Op { op, .. } => op.mnemonic(),
            Instruction::Fence => "fence",
            Instruction::Ecall => "ecall",
            Instruction::Ebreak => "ebreak",
            Instruction::Csr { op, imm, .. } => match (op, imm) {
                (CsrOp::Rw, false) => "csrrw",
                (CsrOp::Rs, false) => "csrrs",
                (CsrOp::Rc, false) => "csrrc",
                (CsrOp::Rw, true) => "csrrwi",
                (CsrOp::Rs, true) => "csrrsi",
                (CsrOp::Rc, true) => "csrrci",
            },
            Instruction::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.mnemonic();
        match *self {
            Instruction::Lui { rd, imm } | Instruction::Auipc { rd, imm } => {
                write!(f, "{:<8}x{}, {:#x}", m, rd, imm >> 12)
            }
            Instruction::Jal { rd, offset } => write!(f, "{:<8}x{}, {}", m, rd, offset),
            Instruction::Jalr { rd, rs1, offset } => {
                write!(f, "{:<8}x{}, x{}, {}", m, rd, rs1, offset)
            }
            Instruction::Branch {
                rs1, rs2, offset, ..
            } => write!(f, "{:<8}x{}, x{}, {}", m, rs1, rs2, offset),
            Instruction::Load {
                rd, rs1, offset, ..
            } => write!(f, "{:<8}x{}, {}(x{})", m, rd, offset, rs1),
            Instruction::Store {
                rs1, rs2, offset, ..
            } => write!(f, "{:<8}x{}, {}(x{})", m, rs2, offset, rs1),
            Instruction::OpImm { rd, rs1, imm, .. } => {
                write!(f, "{:<8}x{}, x{}, {}", m, rd, rs1, imm)
            }
            Instruction::Op { rd, rs1, rs2, .. } => {
                write!(f, "{:<8}x{}, x{}, x{}", m, rd, rs1, rs2)
            }
            Instruction::Csr {
                imm, rd, src, csr, ..
            } => {
                if imm {
                    write!(f, "{:<8}x{}, {:#x}, {}", m, rd, csr, src)
                } else {
                    write!(f, "{:<8}x{}, {:#x}, x{}", m, rd, csr, src)
                }
            }
            Instruction::Unknown(raw) => write!(f, "{:<8}{:#010x}", m, raw),
            Instruction::Fence | Instruction::Ecall | Instruction::Ebreak => f.write_str(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_immediates() {
        // addi x10, x0, -1
        assert_eq!(
            decode_rv32(0xFFF0_0513),
            Instruction::OpImm {
                op: AluOp::Add,
                rd: 10,
                rs1: 0,
                imm: -1
            }
        );
        // sw x5, -4(x2)
        assert_eq!(
            decode_rv32(0xFE51_2E23),
            Instruction::Store {
                width: MemWidth::Word,
                rs1: 2,
                rs2: 5,
                offset: -4
            }
        );
        // beq x0, x0, -8
        assert_eq!(
            decode_rv32(0xFE00_0CE3),
            Instruction::Branch {
                cond: BranchCond::Eq,
                rs1: 0,
                rs2: 0,
                offset: -8
            }
        );
        // jal x1, 2048
        assert_eq!(
            decode_rv32(0x0010_00EF),
            Instruction::Jal { rd: 1, offset: 2048 }
        );
        // jal x0, -4
        assert_eq!(
            decode_rv32(0xFFDF_F06F),
            Instruction::Jal { rd: 0, offset: -4 }
        );
    }

    #[test]
    fn test_shift_immediates() {
        // srai x1, x2, 3
        assert_eq!(
            decode_rv32(0x4031_5093),
            Instruction::OpImm {
                op: AluOp::Sra,
                rd: 1,
                rs1: 2,
                imm: 3
            }
        );
        // slli with funct7 bits set is reserved
        assert!(matches!(decode_rv32(0x4031_1093), Instruction::Unknown(_)));
    }

    #[test]
    fn test_system_instructions() {
        assert_eq!(decode_rv32(EBREAK), Instruction::Ebreak);
        assert_eq!(decode_rv32(0x0000_0073), Instruction::Ecall);
        assert!(matches!(
            decode_rv32(0x3000_2573),
            Instruction::Csr {
                op: CsrOp::Rs,
                imm: false,
                rd: 10,
                csr: 0x300,
                ..
            }
        ));
        assert!(matches!(decode_rv32(0), Instruction::Unknown(0)));
    }

    #[test]
    fn test_disassembly() {
        assert_eq!(decode_rv32(0x0050_0093).to_string(), "addi    x1, x0, 5");
        assert_eq!(decode_rv32(0x0020_81B3).to_string(), "add     x3, x1, x2");
        assert_eq!(decode_rv32(0x0000_A103).to_string(), "lw      x2, 0(x1)");
        assert_eq!(decode_rv32(0x8000_02B7).to_string(), "lui     x5, 0x80000");
        assert_eq!(decode_rv32(EBREAK).to_string(), "ebreak");
        assert_eq!(decode_rv32(BUBBLE).to_string(), "addi    x0, x0, 0");
    }

    #[test]
    fn test_alu_and_branch_semantics() {
        assert_eq!(AluOp::Sra.apply(0x8000_0000, 4), 0xF800_0000);
        assert_eq!(AluOp::Srl.apply(0x8000_0000, 36), 0x0800_0000);
        assert_eq!(AluOp::Slt.apply(u32::MAX, 0), 1);
        assert_eq!(AluOp::Sltu.apply(u32::MAX, 0), 0);
        assert!(BranchCond::Ge.taken(0, u32::MAX));
        assert!(!BranchCond::Geu.taken(0, u32::MAX));
    }
}
