//! RISC-V ISA 声明与解码
//!
//! 本模块提供表驱动的解码系统：
//! - `InstructionDeclaration`: 指令编码声明（mask/pattern + 操作数字段）
//! - `build`: 从声明表构建解码树，检测歧义
//! - `DecoderTree`: 每种 XLEN 一棵，只读、可共享
//! - `Operands`: 按声明顺序提取的操作数

mod builder;
mod decl;
pub mod fields;
mod operands;
mod priv_instr;
mod rv_base;
mod rv_m;
mod rvc;
mod tree;
mod zicsr;

pub use builder::{build, BuildError};
pub use decl::{
    ArgumentField, BitSegment, DeclKind, Extension, InstrSize, InstructionDeclaration, Variant, Xlen,
};
pub use operands::{InstructionApplication, Operands, MAX_OPERANDS, MAX_PARAMS};
pub use priv_instr::{MRET_ENCODING, PRIV_DECLS, SFENCE_VMA_MASK, SFENCE_VMA_PATTERN, SRET_ENCODING, WFI_ENCODING};
pub use rv_base::RV_BASE_DECLS;
pub use rv_m::RV_M_DECLS;
pub use rvc::RVC_DECLS;
pub use tree::{DeclId, Decision, DecoderTree, Node, NodeId};
pub use zicsr::ZICSR_DECLS;

/// 内置的全部声明：I、M、Zicsr、特权指令与 C 扩展
pub fn standard_declarations() -> Vec<InstructionDeclaration> {
    [RV_BASE_DECLS, RV_M_DECLS, ZICSR_DECLS, PRIV_DECLS, RVC_DECLS]
        .iter()
        .flat_map(|table| table.iter().copied())
        .collect()
}

/// 便捷函数：用内置声明构建两种宽度的解码树
pub fn standard_trees() -> Result<(DecoderTree, DecoderTree), BuildError> {
    let decls = standard_declarations();
    Ok((build(Xlen::X32, &decls)?, build(Xlen::X64, &decls)?))
}
