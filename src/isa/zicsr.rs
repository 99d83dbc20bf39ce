//! Zicsr 扩展：CSR 读写指令
//!
//! 操作数顺序统一为 `[rd, rs1/zimm, csr]`

use crate::isa::decl::{Extension, InstructionDeclaration as Decl};
use crate::isa::fields::*;

/// Zicsr 指令声明表
pub static ZICSR_DECLS: &[Decl] = &[
    Decl::new("CSRRW", I_TYPE_MASK, i_type(0b001, OP_SYSTEM), &[RD, RS1, CSR]).ext(Extension::Zicsr),
    Decl::new("CSRRS", I_TYPE_MASK, i_type(0b010, OP_SYSTEM), &[RD, RS1, CSR]).ext(Extension::Zicsr),
    Decl::new("CSRRC", I_TYPE_MASK, i_type(0b011, OP_SYSTEM), &[RD, RS1, CSR]).ext(Extension::Zicsr),
    Decl::new("CSRRWI", I_TYPE_MASK, i_type(0b101, OP_SYSTEM), &[RD, ZIMM, CSR]).ext(Extension::Zicsr),
    Decl::new("CSRRSI", I_TYPE_MASK, i_type(0b110, OP_SYSTEM), &[RD, ZIMM, CSR]).ext(Extension::Zicsr),
    Decl::new("CSRRCI", I_TYPE_MASK, i_type(0b111, OP_SYSTEM), &[RD, ZIMM, CSR]).ext(Extension::Zicsr),
];
