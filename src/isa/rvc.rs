//! C 扩展：16-bit 压缩指令声明
//!
//! 每条压缩指令的操作数按其展开后的 32-bit 指令顺序排列，
//! 由同一个 handler 执行；隐含的寄存器用常量字段补齐。
//! 保留编码用显式非法声明覆盖，它们比对应的普通声明固定更多的位。

use crate::isa::decl::{Extension, InstructionDeclaration as Decl};
use crate::isa::fields::*;

const Q0: u32 = 0b00;
const Q1: u32 = 0b01;
const Q2: u32 = 0b10;

/// rd/rs1 [11:7] 固定
const C_RD_MASK: u32 = 0x0F80;
/// imm [12|6:2] 固定
const C_IMM_MASK: u32 = 0x107C;
/// rs2 [6:2] 固定
const C_RS2_MASK: u32 = 0x007C;
/// bit 12
const C_BIT12: u32 = 0x1000;
/// funct2 [11:10]
const C_F2_MASK: u32 = 0x0C00;
/// funct2 [6:5]
const C_F2_LOW_MASK: u32 = 0x0060;

/// C 扩展指令声明表
pub static RVC_DECLS: &[Decl] = &[
    // ========== Quadrant 0 ==========
    // 全零指令字以及 nzuimm 为 0 的 C.ADDI4SPN 均为非法
    Decl::new("C.ILLEGAL", 0xFFE3, c_type(0b000, Q0), &[]).ext(Extension::C).illegal(),
    Decl::new("C.ADDI4SPN", C_MASK, c_type(0b000, Q0), &[C_RD_P, X2, C_IMM_ADDI4SPN]).ext(Extension::C),
    Decl::new("C.LW", C_MASK, c_type(0b010, Q0), &[C_RD_P, C_RS1_P, C_UIMM_W]).ext(Extension::C),
    Decl::new("C.LD", C_MASK, c_type(0b011, Q0), &[C_RD_P, C_RS1_P, C_UIMM_D]).ext(Extension::C).rv64(),
    Decl::new("C.SW", C_MASK, c_type(0b110, Q0), &[C_RS1_P, C_RD_P, C_UIMM_W]).ext(Extension::C),
    Decl::new("C.SD", C_MASK, c_type(0b111, Q0), &[C_RS1_P, C_RD_P, C_UIMM_D]).ext(Extension::C).rv64(),

    // ========== Quadrant 1 ==========
    // rd 为 x0 的 C.ADDI 是 HINT，包括 C.NOP 本身
    Decl::new("C.NOP", C_MASK | C_RD_MASK, c_type(0b000, Q1), &[]).ext(Extension::C).nop(),
    Decl::new("C.ADDI", C_MASK, c_type(0b000, Q1), &[RD, RD, C_IMM6]).ext(Extension::C),
    Decl::new("C.JAL", C_MASK, c_type(0b001, Q1), &[X1, C_IMM_J]).ext(Extension::C).rv32(),
    // rd 为 x0 的 C.ADDIW 保留
    Decl::new("C.ILLEGAL.ADDIW", C_MASK | C_RD_MASK, c_type(0b001, Q1), &[]).ext(Extension::C).illegal().rv64(),
    Decl::new("C.ADDIW", C_MASK, c_type(0b001, Q1), &[RD, RD, C_IMM6]).ext(Extension::C).rv64(),
    Decl::new("C.LI", C_MASK, c_type(0b010, Q1), &[RD, X0, C_IMM6]).ext(Extension::C),
    Decl::new("C.ILLEGAL.ADDI16SP", C_MASK | C_RD_MASK | C_IMM_MASK, c_type(0b011, Q1) | (2 << 7), &[])
        .ext(Extension::C)
        .illegal(),
    Decl::new("C.ADDI16SP", C_MASK | C_RD_MASK, c_type(0b011, Q1) | (2 << 7), &[X2, X2, C_IMM_ADDI16SP]).ext(Extension::C),
    Decl::new("C.ILLEGAL.LUI", C_MASK | C_IMM_MASK, c_type(0b011, Q1), &[]).ext(Extension::C).illegal(),
    Decl::new("C.LUI", C_MASK, c_type(0b011, Q1), &[RD, C_IMM_LUI]).ext(Extension::C),
    Decl::new("C.SRLI", C_MASK | C_BIT12 | C_F2_MASK, c_type(0b100, Q1), &[C_RS1_P, C_RS1_P, C_SHAMT5])
        .ext(Extension::C)
        .rv32(),
    Decl::new("C.SRAI", C_MASK | C_BIT12 | C_F2_MASK, c_type(0b100, Q1) | 0x0400, &[C_RS1_P, C_RS1_P, C_SHAMT5])
        .ext(Extension::C)
        .rv32(),
    Decl::new("C.SRLI", C_MASK | C_F2_MASK, c_type(0b100, Q1), &[C_RS1_P, C_RS1_P, C_SHAMT6])
        .ext(Extension::C)
        .rv64(),
    Decl::new("C.SRAI", C_MASK | C_F2_MASK, c_type(0b100, Q1) | 0x0400, &[C_RS1_P, C_RS1_P, C_SHAMT6])
        .ext(Extension::C)
        .rv64(),
    Decl::new("C.ANDI", C_MASK | C_F2_MASK, c_type(0b100, Q1) | 0x0800, &[C_RS1_P, C_RS1_P, C_IMM6]).ext(Extension::C),
    Decl::new("C.SUB", C_MASK | C_BIT12 | C_F2_MASK | C_F2_LOW_MASK, c_type(0b100, Q1) | 0x0C00, &[C_RS1_P, C_RS1_P, C_RD_P])
        .ext(Extension::C),
    Decl::new("C.XOR", C_MASK | C_BIT12 | C_F2_MASK | C_F2_LOW_MASK, c_type(0b100, Q1) | 0x0C20, &[C_RS1_P, C_RS1_P, C_RD_P])
        .ext(Extension::C),
    Decl::new("C.OR", C_MASK | C_BIT12 | C_F2_MASK | C_F2_LOW_MASK, c_type(0b100, Q1) | 0x0C40, &[C_RS1_P, C_RS1_P, C_RD_P])
        .ext(Extension::C),
    Decl::new("C.AND", C_MASK | C_BIT12 | C_F2_MASK | C_F2_LOW_MASK, c_type(0b100, Q1) | 0x0C60, &[C_RS1_P, C_RS1_P, C_RD_P])
        .ext(Extension::C),
    Decl::new("C.SUBW", C_MASK | C_BIT12 | C_F2_MASK | C_F2_LOW_MASK, c_type(0b100, Q1) | 0x1C00, &[C_RS1_P, C_RS1_P, C_RD_P])
        .ext(Extension::C)
        .rv64(),
    Decl::new("C.ADDW", C_MASK | C_BIT12 | C_F2_MASK | C_F2_LOW_MASK, c_type(0b100, Q1) | 0x1C20, &[C_RS1_P, C_RS1_P, C_RD_P])
        .ext(Extension::C)
        .rv64(),
    Decl::new("C.J", C_MASK, c_type(0b101, Q1), &[X0, C_IMM_J]).ext(Extension::C),
    Decl::new("C.BEQZ", C_MASK, c_type(0b110, Q1), &[C_RS1_P, X0, C_IMM_B]).ext(Extension::C),
    Decl::new("C.BNEZ", C_MASK, c_type(0b111, Q1), &[C_RS1_P, X0, C_IMM_B]).ext(Extension::C),

    // ========== Quadrant 2 ==========
    Decl::new("C.SLLI", C_MASK | C_BIT12, c_type(0b000, Q2), &[RD, RD, C_SHAMT5]).ext(Extension::C).rv32(),
    Decl::new("C.SLLI", C_MASK, c_type(0b000, Q2), &[RD, RD, C_SHAMT6]).ext(Extension::C).rv64(),
    Decl::new("C.ILLEGAL.LWSP", C_MASK | C_RD_MASK, c_type(0b010, Q2), &[]).ext(Extension::C).illegal(),
    Decl::new("C.LWSP", C_MASK, c_type(0b010, Q2), &[RD, X2, C_UIMM_LWSP]).ext(Extension::C),
    Decl::new("C.ILLEGAL.LDSP", C_MASK | C_RD_MASK, c_type(0b011, Q2), &[]).ext(Extension::C).illegal().rv64(),
    Decl::new("C.LDSP", C_MASK, c_type(0b011, Q2), &[RD, X2, C_UIMM_LDSP]).ext(Extension::C).rv64(),
    Decl::new("C.ILLEGAL.JR", C_MASK | C_BIT12 | C_RD_MASK | C_RS2_MASK, c_type(0b100, Q2), &[])
        .ext(Extension::C)
        .illegal(),
    Decl::new("C.JR", C_MASK | C_BIT12 | C_RS2_MASK, c_type(0b100, Q2), &[X0, RD, ZERO]).ext(Extension::C),
    Decl::new("C.MV", C_MASK | C_BIT12, c_type(0b100, Q2), &[RD, X0, C_RS2]).ext(Extension::C),
    Decl::new("C.EBREAK", C_MASK | C_BIT12 | C_RD_MASK | C_RS2_MASK, c_type(0b100, Q2) | C_BIT12, &[]).ext(Extension::C),
    Decl::new("C.JALR", C_MASK | C_BIT12 | C_RS2_MASK, c_type(0b100, Q2) | C_BIT12, &[X1, RD, ZERO]).ext(Extension::C),
    Decl::new("C.ADD", C_MASK | C_BIT12, c_type(0b100, Q2) | C_BIT12, &[RD, RD, C_RS2]).ext(Extension::C),
    Decl::new("C.SWSP", C_MASK, c_type(0b110, Q2), &[X2, C_RS2, C_UIMM_SWSP]).ext(Extension::C),
    Decl::new("C.SDSP", C_MASK, c_type(0b111, Q2), &[X2, C_RS2, C_UIMM_SDSP]).ext(Extension::C).rv64(),
];
