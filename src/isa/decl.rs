//! 指令声明
//!
//! 一条声明描述一种指令编码：助记符、固定位 mask/pattern、操作数提取规则、
//! 编码宽度以及所属的 XLEN 变体。同一份声明表同时用于构建解码树、
//! 提取操作数和反向编码（测试/汇编辅助）。

use std::fmt;

use super::operands::Operands;

/// 寄存器宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Xlen {
    X32,
    X64,
}

impl Xlen {
    /// 位宽
    pub const fn bits(self) -> u32 {
        match self {
            Xlen::X32 => 32,
            Xlen::X64 => 64,
        }
    }

    /// misa.MXL 编码
    pub const fn mxl(self) -> u64 {
        match self {
            Xlen::X32 => 1,
            Xlen::X64 => 2,
        }
    }

    /// 寄存器值规范化：RV32 下保存为低 32 位的符号扩展
    #[inline]
    pub const fn normalize(self, value: u64) -> u64 {
        match self {
            Xlen::X32 => value as u32 as i32 as i64 as u64,
            Xlen::X64 => value,
        }
    }

    /// 地址规范化：RV32 下只取低 32 位
    #[inline]
    pub const fn address(self, value: u64) -> u64 {
        match self {
            Xlen::X32 => value as u32 as u64,
            Xlen::X64 => value,
        }
    }

    /// 寄存器移位量掩码
    #[inline]
    pub const fn shamt_mask(self) -> u32 {
        self.bits() - 1
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RV{}", self.bits())
    }
}

/// 编码宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrSize {
    /// 16-bit 压缩指令
    Compressed,
    /// 32-bit 标准指令
    Standard,
}

impl InstrSize {
    /// 由指令字最低两位判定宽度：`11` 为 32-bit，其余为 16-bit
    #[inline]
    pub const fn of(raw: u32) -> Self {
        if raw & 0b11 == 0b11 {
            InstrSize::Standard
        } else {
            InstrSize::Compressed
        }
    }

    #[inline]
    pub const fn bytes(self) -> u64 {
        match self {
            InstrSize::Compressed => 2,
            InstrSize::Standard => 4,
        }
    }
}

/// 声明适用的 XLEN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// 两种宽度都有效
    Common,
    /// 仅 RV32
    Rv32,
    /// 仅 RV64
    Rv64,
}

impl Variant {
    pub const fn includes(self, xlen: Xlen) -> bool {
        matches!(
            (self, xlen),
            (Variant::Common, _) | (Variant::Rv32, Xlen::X32) | (Variant::Rv64, Xlen::X64)
        )
    }
}

/// 指令所属扩展（用于 misa 报告和调试）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    I,
    M,
    C,
    Zicsr,
    Priv,
}

impl Extension {
    /// misa 中对应的字母位；Zicsr 和特权指令没有独立位
    pub const fn misa_bit(self) -> Option<u32> {
        match self {
            Extension::I => Some((b'I' - b'A') as u32),
            Extension::M => Some((b'M' - b'A') as u32),
            Extension::C => Some((b'C' - b'A') as u32),
            Extension::Zicsr | Extension::Priv => None,
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Extension::I => "I",
            Extension::M => "M",
            Extension::C => "C",
            Extension::Zicsr => "Zicsr",
            Extension::Priv => "Priv",
        };
        f.write_str(name)
    }
}

/// 叶子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// 普通指令，需要绑定 handler
    Regular,
    /// 解码为空操作（HINT、FENCE 等），只推进 PC
    Nop,
    /// 显式非法编码，比同区域的普通声明更具体时生效
    Illegal,
}

/// 一个连续的位段：指令字 `[lsb, lsb+len)` 放到操作数的 `[dst, dst+len)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitSegment {
    pub lsb: u8,
    pub len: u8,
    pub dst: u8,
}

#[inline]
const fn low_mask(len: u8) -> u32 {
    if len >= 32 { u32::MAX } else { (1u32 << len) - 1 }
}

/// 操作数提取规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentField {
    /// 若干位段拼接，可选按最高位符号扩展
    Bits {
        segments: &'static [BitSegment],
        signed: bool,
    },
    /// 压缩指令的 3-bit 寄存器号，映射到 x8..x15
    CompressedReg { lsb: u8 },
    /// 固定值（压缩指令隐含的 x0/x1/x2 等）
    Constant(i64),
}

impl ArgumentField {
    /// 拼接后的总位宽
    fn width(segments: &[BitSegment]) -> u32 {
        segments
            .iter()
            .map(|s| u32::from(s.dst) + u32::from(s.len))
            .max()
            .unwrap_or(0)
    }

    /// 从指令字提取操作数值
    pub fn extract(&self, raw: u32) -> i64 {
        match *self {
            ArgumentField::Bits { segments, signed } => {
                let mut value = 0u64;
                for seg in segments {
                    let part = (raw >> seg.lsb) & low_mask(seg.len);
                    value |= u64::from(part) << seg.dst;
                }
                let width = Self::width(segments);
                if signed && width > 0 && width < 64 {
                    let shift = 64 - width;
                    ((value << shift) as i64) >> shift
                } else {
                    value as i64
                }
            }
            ArgumentField::CompressedReg { lsb } => 8 + i64::from((raw >> lsb) & 0b111),
            ArgumentField::Constant(value) => value,
        }
    }

    /// `extract` 的逆：把操作数值放回它占用的位
    pub fn insert(&self, value: i64) -> u32 {
        match *self {
            ArgumentField::Bits { segments, .. } => segments.iter().fold(0, |acc, seg| {
                let part = ((value as u64) >> seg.dst) as u32 & low_mask(seg.len);
                acc | (part << seg.lsb)
            }),
            ArgumentField::CompressedReg { lsb } => (((value - 8) as u32) & 0b111) << lsb,
            ArgumentField::Constant(_) => 0,
        }
    }

    /// 占用的指令位
    pub fn occupied(&self) -> u32 {
        match *self {
            ArgumentField::Bits { segments, .. } => segments
                .iter()
                .fold(0, |acc, seg| acc | (low_mask(seg.len) << seg.lsb)),
            ArgumentField::CompressedReg { lsb } => 0b111 << lsb,
            ArgumentField::Constant(_) => 0,
        }
    }
}

/// 指令声明
///
/// 与解码树构建、操作数提取共用：
/// - 构建：通过 mask/pattern 划分编码空间
/// - 执行：按 `args` 顺序提取操作数，交给同名 handler
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InstructionDeclaration {
    /// 助记符，也是 handler 绑定的键
    pub mnemonic: &'static str,
    /// 固定位掩码
    pub mask: u32,
    /// 固定位取值，满足 `pattern & !mask == 0`
    pub pattern: u32,
    /// 操作数提取规则，按 handler 参数顺序排列
    pub args: &'static [ArgumentField],
    pub size: InstrSize,
    pub variant: Variant,
    pub extension: Extension,
    pub kind: DeclKind,
}

impl InstructionDeclaration {
    /// 创建普通声明，宽度由 pattern 低两位决定
    pub const fn new(
        mnemonic: &'static str,
        mask: u32,
        pattern: u32,
        args: &'static [ArgumentField],
    ) -> Self {
        Self {
            mnemonic,
            mask,
            pattern,
            args,
            size: InstrSize::of(pattern),
            variant: Variant::Common,
            extension: Extension::I,
            kind: DeclKind::Regular,
        }
    }

    pub const fn rv32(mut self) -> Self {
        self.variant = Variant::Rv32;
        self
    }

    pub const fn rv64(mut self) -> Self {
        self.variant = Variant::Rv64;
        self
    }

    pub const fn ext(mut self, extension: Extension) -> Self {
        self.extension = extension;
        self
    }

    pub const fn nop(mut self) -> Self {
        self.kind = DeclKind::Nop;
        self
    }

    pub const fn illegal(mut self) -> Self {
        self.kind = DeclKind::Illegal;
        self
    }

    /// 检查指令字是否匹配此声明
    #[inline]
    pub fn matches(&self, raw: u32) -> bool {
        (raw & self.mask) == self.pattern
    }

    /// 固定位个数，越多越具体
    #[inline]
    pub fn specificity(&self) -> u32 {
        self.mask.count_ones()
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// 两条声明是否存在同时匹配的指令字
    pub fn overlaps(&self, other: &InstructionDeclaration) -> bool {
        let common = self.mask & other.mask;
        (self.pattern & common) == (other.pattern & common)
    }

    /// 按声明顺序提取全部操作数
    #[inline]
    pub fn apply(&self, raw: u32) -> Operands {
        Operands::extract(self, raw)
    }

    /// 由操作数值组装指令字，多余的值被忽略
    pub fn encode(&self, values: &[i64]) -> u32 {
        self.args
            .iter()
            .zip(values)
            .fold(self.pattern, |raw, (field, &value)| raw | field.insert(value))
    }
}

impl fmt::Debug for InstructionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionDeclaration")
            .field("mnemonic", &self.mnemonic)
            .field("mask", &format_args!("0x{:08X}", self.mask))
            .field("pattern", &format_args!("0x{:08X}", self.pattern))
            .field("variant", &self.variant)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for InstructionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic)
    }
}
