//! 已解码指令的操作数
//!
//! 操作数以定长数组保存，执行路径上不分配内存。
//! 绑定需要时，指令宽度和 PC 依次追加在声明的操作数之后。

use std::fmt;

use super::decl::InstructionDeclaration;

/// 单条声明允许的最大操作数个数
pub const MAX_OPERANDS: usize = 5;

/// 追加指令宽度与 PC 后的最大长度
pub const MAX_PARAMS: usize = MAX_OPERANDS + 2;

/// 操作数序列
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Operands {
    values: [i64; MAX_PARAMS],
    len: u8,
}

impl Operands {
    /// 按声明顺序提取操作数
    pub fn extract(decl: &InstructionDeclaration, raw: u32) -> Self {
        let mut ops = Operands::default();
        for field in decl.args.iter().take(MAX_OPERANDS) {
            ops.push(field.extract(raw));
        }
        ops
    }

    /// 追加一个值，超出容量时忽略
    #[inline]
    pub fn push(&mut self, value: i64) {
        let len = usize::from(self.len);
        if len < MAX_PARAMS {
            self.values[len] = value;
            self.len += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[i64] {
        &self.values[..self.len()]
    }

    /// 第 `index` 个操作数的原始值，越界为 0
    #[inline]
    pub fn get(&self, index: usize) -> i64 {
        self.as_slice().get(index).copied().unwrap_or(0)
    }

    /// 作为寄存器号
    #[inline]
    pub fn reg(&self, index: usize) -> usize {
        (self.get(index) & 0x1F) as usize
    }

    /// 作为有符号立即数
    #[inline]
    pub fn imm(&self, index: usize) -> i64 {
        self.get(index)
    }

    /// 作为无符号值（地址、CSR 号、移位量）
    #[inline]
    pub fn uimm(&self, index: usize) -> u64 {
        self.get(index) as u64
    }
}

impl fmt::Debug for Operands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// 一次解码的结果：声明加上提取出的操作数
#[derive(Debug, Clone, Copy)]
pub struct InstructionApplication<'a> {
    pub decl: &'a InstructionDeclaration,
    pub raw: u32,
    pub operands: Operands,
}

impl<'a> InstructionApplication<'a> {
    pub fn new(decl: &'a InstructionDeclaration, raw: u32) -> Self {
        Self {
            decl,
            raw,
            operands: decl.apply(raw),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        self.decl.mnemonic
    }
}

impl fmt::Display for InstructionApplication<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.decl.mnemonic.to_ascii_lowercase().as_str())?;
        for (i, value) in self.operands.as_slice().iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::fields::*;

    static ADDI: InstructionDeclaration =
        InstructionDeclaration::new("ADDI", I_TYPE_MASK, i_type(0b000, OP_IMM), &[RD, RS1, IMM_I]);

    #[test]
    fn test_extract_in_declared_order() {
        // addi x1, x2, -5
        let ops = ADDI.apply(0xFFB10093);
        assert_eq!(ops.as_slice(), &[1, 2, -5]);
        assert_eq!(ops.reg(0), 1);
        assert_eq!(ops.reg(1), 2);
        assert_eq!(ops.imm(2), -5);
    }

    #[test]
    fn test_push_appends_after_operands() {
        let mut ops = ADDI.apply(0xFFB10093);
        ops.push(4);
        ops.push(0x1000);
        assert_eq!(ops.len(), 5);
        assert_eq!(ops.uimm(4), 0x1000);
    }

    #[test]
    fn test_application_display() {
        let app = InstructionApplication::new(&ADDI, 0xFFB10093);
        assert_eq!(app.to_string(), "addi 1, 2, -5");
    }
}
