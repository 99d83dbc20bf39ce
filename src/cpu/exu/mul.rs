//! RV M 乘除法指令
//!
//! 除零：商为全 1，余数为被除数。
//! 有符号溢出（最小值 / -1）：商为被除数，余数为 0。

use super::super::dispatch::{ExecResult, Flow};
use super::super::Cpu;
use crate::isa::{Operands, Xlen};

fn mul_op(cpu: &mut Cpu, ops: &Operands, f: impl FnOnce(Xlen, u64, u64) -> u64) -> ExecResult {
    let a = cpu.read_reg(ops.reg(1));
    let b = cpu.read_reg(ops.reg(2));
    let result = f(cpu.xlen(), a, b);
    cpu.write_reg(ops.reg(0), result);
    Ok(Flow::Next)
}

#[inline]
fn sext32(value: u64) -> u64 {
    value as u32 as i32 as i64 as u64
}

/// 无符号视图：RV32 下只取低 32 位
#[inline]
fn unsigned(xlen: Xlen, value: u64) -> u64 {
    xlen.address(value)
}

fn signed_div(a: i64, b: i64) -> i64 {
    if b == 0 { -1 } else { a.wrapping_div(b) }
}

fn signed_rem(a: i64, b: i64) -> i64 {
    if b == 0 { a } else { a.wrapping_rem(b) }
}

fn unsigned_div(a: u64, b: u64) -> u64 {
    if b == 0 { u64::MAX } else { a / b }
}

fn unsigned_rem(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { a % b }
}

pub fn mul(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| a.wrapping_mul(b))
}

pub fn mulh(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |xlen, a, b| {
        let product = i128::from(a as i64) * i128::from(b as i64);
        (product >> xlen.bits()) as u64
    })
}

pub fn mulhsu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |xlen, a, b| {
        let product = i128::from(a as i64) * i128::from(unsigned(xlen, b));
        (product >> xlen.bits()) as u64
    })
}

pub fn mulhu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |xlen, a, b| {
        let product = u128::from(unsigned(xlen, a)) * u128::from(unsigned(xlen, b));
        (product >> xlen.bits()) as u64
    })
}

// 寄存器值已按 XLEN 符号扩展，RV32 的 i32::MIN / -1 在 64 位上不会溢出，
// 其结果 2^31 经 write_reg 规范化后回到 i32::MIN
pub fn div(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| signed_div(a as i64, b as i64) as u64)
}

pub fn divu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |xlen, a, b| unsigned_div(unsigned(xlen, a), unsigned(xlen, b)))
}

pub fn rem(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| signed_rem(a as i64, b as i64) as u64)
}

pub fn remu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |xlen, a, b| unsigned_rem(unsigned(xlen, a), unsigned(xlen, b)))
}

// ========== RV64 *W 指令 ==========

pub fn mulw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| sext32(a.wrapping_mul(b)))
}

pub fn divw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| {
        let (a, b) = (a as i32, b as i32);
        let q = if b == 0 { -1 } else { a.wrapping_div(b) };
        q as i64 as u64
    })
}

pub fn divuw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| {
        let (a, b) = (a as u32, b as u32);
        let q = if b == 0 { u32::MAX } else { a / b };
        sext32(u64::from(q))
    })
}

pub fn remw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| {
        let (a, b) = (a as i32, b as i32);
        let r = if b == 0 { a } else { a.wrapping_rem(b) };
        r as i64 as u64
    })
}

pub fn remuw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    mul_op(cpu, ops, |_, a, b| {
        let (a, b) = (a as u32, b as u32);
        let r = if b == 0 { a } else { a % b };
        sext32(u64::from(r))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_edge_cases() {
        assert_eq!(signed_div(7, 0), -1);
        assert_eq!(signed_rem(7, 0), 7);
        assert_eq!(signed_div(i64::MIN, -1), i64::MIN);
        assert_eq!(signed_rem(i64::MIN, -1), 0);
        assert_eq!(unsigned_div(7, 0), u64::MAX);
        assert_eq!(unsigned_rem(7, 0), 7);
        assert_eq!(signed_div(-7, 2), -3);
        assert_eq!(signed_rem(-7, 2), -1);
    }
}
