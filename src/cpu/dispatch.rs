//! 指令集绑定
//!
//! 把两棵解码树的每个普通叶子绑定到一个执行 handler，
//! 并在绑定时确定该指令执行后 PC 如何推进。
//! 构建完成的 `InstructionSet` 只读，可以用 `Arc` 在多个 CPU 间共享。

use std::collections::HashMap;

use thiserror::Error;

use super::trap::Exception;
use super::Cpu;
use crate::isa::{
    self, BuildError, DeclKind, Decision, DecoderTree, Extension, InstrSize, InstructionApplication,
    InstructionDeclaration, Operands, Xlen,
};

/// 执行结果：分支是否跳转
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 顺序执行
    Next,
    /// 分支已跳转，handler 已写入新 PC
    Taken,
}

pub type ExecResult = Result<Flow, Exception>;

/// 执行 handler：读取操作数、修改 CPU 状态
pub type Handler = fn(&mut Cpu, &Operands) -> ExecResult;

/// 执行后 PC 的推进方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcUpdate {
    /// PC += 指令宽度
    Sequential,
    /// 仅在 `Flow::Taken` 时不推进
    Branch,
    /// 从不推进，handler 负责写 PC
    Jump,
    /// 从不推进：trap 已重定向 PC，或返回指令已恢复 PC
    TrapBoundary,
}

impl PcUpdate {
    /// 按助记符族分类，压缩指令去掉 `C.` 前缀后按展开形式处理
    pub fn classify(mnemonic: &str) -> Self {
        let base = mnemonic.strip_prefix("C.").unwrap_or(mnemonic);
        match base {
            "ECALL" | "EBREAK" | "MRET" | "SRET" => PcUpdate::TrapBoundary,
            _ if base.starts_with('B') => PcUpdate::Branch,
            _ if base.starts_with('J') => PcUpdate::Jump,
            _ => PcUpdate::Sequential,
        }
    }

    /// 执行结果是否需要推进 PC
    #[inline]
    pub fn advances(self, flow: Flow) -> bool {
        match self {
            PcUpdate::Sequential => true,
            PcUpdate::Branch => flow == Flow::Next,
            PcUpdate::Jump | PcUpdate::TrapBoundary => false,
        }
    }
}

/// handler 定义：助记符与执行函数
///
/// `size`/`pc` 置位时，指令宽度与当前 PC 依次追加在操作数之后。
#[derive(Clone, Copy)]
pub struct HandlerDef {
    pub mnemonic: &'static str,
    pub handler: Handler,
    pub size: bool,
    pub pc: bool,
}

impl HandlerDef {
    pub const fn new(mnemonic: &'static str, handler: Handler) -> Self {
        Self {
            mnemonic,
            handler,
            size: false,
            pc: false,
        }
    }

    /// 追加指令宽度
    pub const fn with_size(mut self) -> Self {
        self.size = true;
        self
    }

    /// 追加当前 PC
    pub const fn with_pc(mut self) -> Self {
        self.pc = true;
        self
    }
}

impl std::fmt::Debug for HandlerDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDef")
            .field("mnemonic", &self.mnemonic)
            .field("size", &self.size)
            .field("pc", &self.pc)
            .finish()
    }
}

/// 一个叶子的绑定
#[derive(Clone, Copy)]
pub struct Binding {
    pub handler: Handler,
    pub size: bool,
    pub pc: bool,
    pub pc_update: PcUpdate,
}

/// 绑定错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("no handler bound for {xlen} instruction {mnemonic}")]
    MissingHandler { mnemonic: &'static str, xlen: Xlen },

    #[error("handler for {0} registered more than once")]
    DuplicateHandler(&'static str),
}

/// 指令集构建错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IsaError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// 一次解码的执行计划
#[derive(Clone, Copy)]
pub enum Dispatch {
    Illegal,
    Nop,
    Execute { binding: Binding, operands: Operands },
}

/// 单一宽度的解码树与绑定表，`bindings` 按树内声明下标索引
struct Table {
    tree: DecoderTree,
    bindings: Vec<Option<Binding>>,
}

impl Table {
    fn bind(tree: DecoderTree, handlers: &HashMap<&'static str, HandlerDef>) -> Result<Self, BindError> {
        let bindings = tree
            .declarations()
            .iter()
            .map(|decl| match decl.kind {
                DeclKind::Regular => {
                    let def = handlers.get(decl.mnemonic).ok_or(BindError::MissingHandler {
                        mnemonic: decl.mnemonic,
                        xlen: tree.xlen(),
                    })?;
                    Ok(Some(Binding {
                        handler: def.handler,
                        size: def.size,
                        pc: def.pc,
                        pc_update: PcUpdate::classify(decl.mnemonic),
                    }))
                }
                DeclKind::Nop | DeclKind::Illegal => Ok(None),
            })
            .collect::<Result<Vec<_>, BindError>>()?;
        Ok(Table { tree, bindings })
    }
}

/// 两种宽度的解码树及其 handler 绑定
pub struct InstructionSet {
    rv32: Table,
    rv64: Table,
    extensions: Vec<Extension>,
}

impl InstructionSet {
    /// 构建解码树并绑定 handler
    ///
    /// 任一宽度中有普通声明没有 handler 时失败；多余的 handler 被忽略。
    pub fn new(declarations: &[InstructionDeclaration], handlers: &[HandlerDef]) -> Result<Self, IsaError> {
        let mut by_name = HashMap::with_capacity(handlers.len());
        for def in handlers {
            if by_name.insert(def.mnemonic, *def).is_some() {
                return Err(BindError::DuplicateHandler(def.mnemonic).into());
            }
        }

        let rv32 = Table::bind(isa::build(Xlen::X32, declarations)?, &by_name)?;
        let rv64 = Table::bind(isa::build(Xlen::X64, declarations)?, &by_name)?;

        let mut extensions: Vec<Extension> = Vec::new();
        for decl in declarations {
            if !extensions.contains(&decl.extension) {
                extensions.push(decl.extension);
            }
        }

        let unused = handlers
            .iter()
            .filter(|def| {
                rv32.tree.find(def.mnemonic).is_none() && rv64.tree.find(def.mnemonic).is_none()
            })
            .count();
        if unused > 0 {
            log::debug!("{} handlers have no matching declaration", unused);
        }
        log::debug!(
            "instruction set bound: {} declarations, {} handlers, extensions {:?}",
            declarations.len(),
            by_name.len(),
            extensions
        );

        Ok(InstructionSet { rv32, rv64, extensions })
    }

    /// 内置声明表与内置 handler
    pub fn standard() -> Result<Self, IsaError> {
        Self::new(&isa::standard_declarations(), super::exu::HANDLERS)
    }

    fn table(&self, xlen: Xlen) -> &Table {
        match xlen {
            Xlen::X32 => &self.rv32,
            Xlen::X64 => &self.rv64,
        }
    }

    pub fn tree(&self, xlen: Xlen) -> &DecoderTree {
        &self.table(xlen).tree
    }

    /// 实现的扩展
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// misa 的扩展字母位
    pub fn misa_extensions(&self) -> u64 {
        self.extensions
            .iter()
            .filter_map(|e| e.misa_bit())
            .fold(0, |acc, bit| acc | (1 << bit))
    }

    /// 反汇编一个指令字，非法编码返回 None
    pub fn disassemble(&self, xlen: Xlen, raw: u32) -> Option<InstructionApplication<'_>> {
        match self.tree(xlen).decide(raw) {
            Decision::Illegal => None,
            Decision::Nop(decl) | Decision::Instruction(_, decl) => Some(InstructionApplication::new(decl, raw)),
        }
    }

    /// 解码并准备执行：提取操作数，按绑定追加宽度与 PC
    pub fn dispatch(&self, xlen: Xlen, raw: u32, pc: u64) -> Dispatch {
        let table = self.table(xlen);
        match table.tree.decide(raw) {
            Decision::Illegal => Dispatch::Illegal,
            Decision::Nop(_) => Dispatch::Nop,
            Decision::Instruction(id, decl) => {
                let Some(binding) = table.bindings[id] else {
                    return Dispatch::Illegal;
                };
                let mut operands = decl.apply(raw);
                if binding.size {
                    operands.push(InstrSize::of(raw).bytes() as i64);
                }
                if binding.pc {
                    operands.push(pc as i64);
                }
                Dispatch::Execute { binding, operands }
            }
        }
    }
}

impl std::fmt::Debug for InstructionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionSet")
            .field("rv32", &self.rv32.tree)
            .field("rv64", &self.rv64.tree)
            .field("extensions", &self.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_families() {
        assert_eq!(PcUpdate::classify("BEQ"), PcUpdate::Branch);
        assert_eq!(PcUpdate::classify("C.BNEZ"), PcUpdate::Branch);
        assert_eq!(PcUpdate::classify("JAL"), PcUpdate::Jump);
        assert_eq!(PcUpdate::classify("C.JR"), PcUpdate::Jump);
        assert_eq!(PcUpdate::classify("ECALL"), PcUpdate::TrapBoundary);
        assert_eq!(PcUpdate::classify("C.EBREAK"), PcUpdate::TrapBoundary);
        assert_eq!(PcUpdate::classify("MRET"), PcUpdate::TrapBoundary);
        assert_eq!(PcUpdate::classify("ADD"), PcUpdate::Sequential);
        assert_eq!(PcUpdate::classify("WFI"), PcUpdate::Sequential);
    }

    #[test]
    fn test_advance_rules() {
        assert!(PcUpdate::Sequential.advances(Flow::Next));
        assert!(PcUpdate::Branch.advances(Flow::Next));
        assert!(!PcUpdate::Branch.advances(Flow::Taken));
        assert!(!PcUpdate::Jump.advances(Flow::Next));
        assert!(!PcUpdate::TrapBoundary.advances(Flow::Next));
    }

    #[test]
    fn test_standard_set_binds() {
        let set = InstructionSet::standard().unwrap();
        let misa = set.misa_extensions();
        for letter in [b'I', b'M', b'C'] {
            assert_ne!(misa & (1 << (letter - b'A')), 0);
        }
    }

    #[test]
    fn test_missing_handler_rejected() {
        let handlers: Vec<HandlerDef> = crate::cpu::exu::HANDLERS
            .iter()
            .filter(|def| def.mnemonic != "ADD")
            .copied()
            .collect();
        match InstructionSet::new(&isa::standard_declarations(), &handlers) {
            Err(IsaError::Bind(BindError::MissingHandler { mnemonic, .. })) => assert_eq!(mnemonic, "ADD"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_handler_rejected() {
        let mut handlers = crate::cpu::exu::HANDLERS.to_vec();
        handlers.push(handlers[0]);
        assert!(matches!(
            InstructionSet::new(&isa::standard_declarations(), &handlers),
            Err(IsaError::Bind(BindError::DuplicateHandler(_)))
        ));
    }

    #[test]
    fn test_dispatch_appends_size_and_pc() {
        let set = InstructionSet::standard().unwrap();
        // jal x1, 8
        match set.dispatch(Xlen::X64, 0x008000EF, 0x1000) {
            Dispatch::Execute { binding, operands } => {
                assert_eq!(binding.pc_update, PcUpdate::Jump);
                assert_eq!(operands.as_slice(), &[1, 8, 4, 0x1000]);
            }
            _ => panic!("jal should execute"),
        }
        // c.j 0
        match set.dispatch(Xlen::X64, 0xA001, 0x2000) {
            Dispatch::Execute { operands, .. } => assert_eq!(operands.as_slice(), &[0, 0, 2, 0x2000]),
            _ => panic!("c.j should execute"),
        }
        assert!(matches!(set.dispatch(Xlen::X64, 0, 0), Dispatch::Illegal));
        assert!(matches!(set.dispatch(Xlen::X64, 0x0001, 0), Dispatch::Nop));
    }

    #[test]
    fn test_disassemble() {
        let set = InstructionSet::standard().unwrap();
        let app = set.disassemble(Xlen::X64, 0xFFB10093).unwrap();
        assert_eq!(app.mnemonic(), "ADDI");
        assert_eq!(app.raw, 0xFFB10093);
        assert_eq!(app.to_string(), "addi 1, 2, -5");

        // 同一指令字按宽度给出不同结果
        assert_eq!(set.disassemble(Xlen::X32, 0x2085).unwrap().to_string(), "c.jal 1, 96");
        assert_eq!(set.disassemble(Xlen::X64, 0x2085).unwrap().to_string(), "c.addiw 1, 1, 1");

        assert_eq!(set.disassemble(Xlen::X64, 0x0001).unwrap().mnemonic(), "C.NOP");
        assert!(set.disassemble(Xlen::X64, 0).is_none());
        assert!(set.disassemble(Xlen::X64, 0x2005).is_none());
    }
}
