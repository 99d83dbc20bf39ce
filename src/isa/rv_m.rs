//! M 扩展：整数乘除法

use crate::isa::decl::{Extension, InstructionDeclaration as Decl};
use crate::isa::fields::*;

const MULDIV: u32 = 0b0000001;

/// M 扩展指令声明表
pub static RV_M_DECLS: &[Decl] = &[
    Decl::new("MUL", R_TYPE_MASK, r_type(MULDIV, 0b000, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("MULH", R_TYPE_MASK, r_type(MULDIV, 0b001, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("MULHSU", R_TYPE_MASK, r_type(MULDIV, 0b010, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("MULHU", R_TYPE_MASK, r_type(MULDIV, 0b011, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("DIV", R_TYPE_MASK, r_type(MULDIV, 0b100, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("DIVU", R_TYPE_MASK, r_type(MULDIV, 0b101, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("REM", R_TYPE_MASK, r_type(MULDIV, 0b110, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),
    Decl::new("REMU", R_TYPE_MASK, r_type(MULDIV, 0b111, OP_REG), &[RD, RS1, RS2]).ext(Extension::M),

    // ========== RV64 ==========
    Decl::new("MULW", R_TYPE_MASK, r_type(MULDIV, 0b000, OP_REG_32), &[RD, RS1, RS2]).ext(Extension::M).rv64(),
    Decl::new("DIVW", R_TYPE_MASK, r_type(MULDIV, 0b100, OP_REG_32), &[RD, RS1, RS2]).ext(Extension::M).rv64(),
    Decl::new("DIVUW", R_TYPE_MASK, r_type(MULDIV, 0b101, OP_REG_32), &[RD, RS1, RS2]).ext(Extension::M).rv64(),
    Decl::new("REMW", R_TYPE_MASK, r_type(MULDIV, 0b110, OP_REG_32), &[RD, RS1, RS2]).ext(Extension::M).rv64(),
    Decl::new("REMUW", R_TYPE_MASK, r_type(MULDIV, 0b111, OP_REG_32), &[RD, RS1, RS2]).ext(Extension::M).rv64(),
];
