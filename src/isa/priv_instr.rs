//! 特权指令声明
//!
//! MRET、SRET、WFI 与 SFENCE.VMA

use crate::isa::decl::{Extension, InstructionDeclaration as Decl};
use crate::isa::fields::{EXACT_MASK, RS1, RS2};

// ========== 特权指令编码 ==========

/// MRET: 0011000 00010 00000 000 00000 1110011
pub const MRET_ENCODING: u32 = 0x30200073;

/// SRET: 0001000 00010 00000 000 00000 1110011
pub const SRET_ENCODING: u32 = 0x10200073;

/// WFI: 0001000 00101 00000 000 00000 1110011
pub const WFI_ENCODING: u32 = 0x10500073;

/// SFENCE.VMA: 0001001 rs2 rs1 000 00000 1110011
pub const SFENCE_VMA_MASK: u32 = 0xFE007FFF;
pub const SFENCE_VMA_PATTERN: u32 = 0x12000073;

/// 特权指令声明表
pub static PRIV_DECLS: &[Decl] = &[
    Decl::new("MRET", EXACT_MASK, MRET_ENCODING, &[]).ext(Extension::Priv),
    Decl::new("SRET", EXACT_MASK, SRET_ENCODING, &[]).ext(Extension::Priv),
    Decl::new("WFI", EXACT_MASK, WFI_ENCODING, &[]).ext(Extension::Priv),
    Decl::new("SFENCE.VMA", SFENCE_VMA_MASK, SFENCE_VMA_PATTERN, &[RS1, RS2]).ext(Extension::Priv),
];
