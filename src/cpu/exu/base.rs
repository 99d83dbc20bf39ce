//! RV I 基础整数指令
//!
//! 寄存器值保存为当前 XLEN 的符号扩展形式，因此有符号与无符号比较
//! 可以直接在 64 位上进行；写回时由 `Cpu::write_reg` 统一规范化。

use super::super::dispatch::{ExecResult, Flow};
use super::super::Cpu;
use crate::isa::{Operands, Xlen};
use crate::memory::AccessSize;

// 操作数布局：
// - 寄存器运算:  [rd, rs1, rs2]
// - 立即数运算:  [rd, rs1, imm]
// - 分支:        [rs1, rs2, offset, pc]
// - JAL:         [rd, offset, size, pc]
// - JALR:        [rd, rs1, offset, size, pc]
// - 加载:        [rd, rs1, offset]
// - 存储:        [rs1, rs2, offset]

#[inline]
fn reg_op(cpu: &mut Cpu, ops: &Operands, f: impl FnOnce(Xlen, u64, u64) -> u64) -> ExecResult {
    let a = cpu.read_reg(ops.reg(1));
    let b = cpu.read_reg(ops.reg(2));
    let result = f(cpu.xlen(), a, b);
    cpu.write_reg(ops.reg(0), result);
    Ok(Flow::Next)
}

#[inline]
fn imm_op(cpu: &mut Cpu, ops: &Operands, f: impl FnOnce(Xlen, u64, i64) -> u64) -> ExecResult {
    let a = cpu.read_reg(ops.reg(1));
    let result = f(cpu.xlen(), a, ops.imm(2));
    cpu.write_reg(ops.reg(0), result);
    Ok(Flow::Next)
}

#[inline]
fn branch(cpu: &mut Cpu, ops: &Operands, cond: impl FnOnce(u64, u64) -> bool) -> ExecResult {
    let a = cpu.read_reg(ops.reg(0));
    let b = cpu.read_reg(ops.reg(1));
    if cond(a, b) {
        let target = ops.uimm(3).wrapping_add(ops.imm(2) as u64);
        cpu.set_pc(target);
        Ok(Flow::Taken)
    } else {
        Ok(Flow::Next)
    }
}

#[inline]
fn load(cpu: &mut Cpu, ops: &Operands, size: AccessSize, extend: fn(u64) -> u64) -> ExecResult {
    let addr = cpu.read_reg(ops.reg(1)).wrapping_add(ops.imm(2) as u64);
    let value = cpu.load(addr, size)?;
    cpu.write_reg(ops.reg(0), extend(value));
    Ok(Flow::Next)
}

#[inline]
fn store(cpu: &mut Cpu, ops: &Operands, size: AccessSize) -> ExecResult {
    let addr = cpu.read_reg(ops.reg(0)).wrapping_add(ops.imm(2) as u64);
    let value = cpu.read_reg(ops.reg(1));
    cpu.store(addr, value, size)?;
    Ok(Flow::Next)
}

#[inline]
fn shift_right_logical(xlen: Xlen, value: u64, shamt: u32) -> u64 {
    match xlen {
        Xlen::X32 => u64::from((value as u32) >> shamt),
        Xlen::X64 => value >> shamt,
    }
}

/// 32 位结果符号扩展到 64 位（*W 指令）
#[inline]
fn sext32(value: u64) -> u64 {
    value as u32 as i32 as i64 as u64
}

// ========== 立即数装载与跳转 ==========

pub fn lui(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    cpu.write_reg(ops.reg(0), ops.imm(1) as u64);
    Ok(Flow::Next)
}

pub fn auipc(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let pc = ops.uimm(2);
    cpu.write_reg(ops.reg(0), pc.wrapping_add(ops.imm(1) as u64));
    Ok(Flow::Next)
}

pub fn jal(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let pc = ops.uimm(3);
    let target = pc.wrapping_add(ops.imm(1) as u64);
    cpu.write_reg(ops.reg(0), pc.wrapping_add(ops.uimm(2)));
    cpu.set_pc(target);
    Ok(Flow::Taken)
}

/// 目标地址在写 rd 之前计算，rd 与 rs1 相同时也成立
pub fn jalr(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let pc = ops.uimm(4);
    let target = cpu.read_reg(ops.reg(1)).wrapping_add(ops.imm(2) as u64) & !1;
    cpu.write_reg(ops.reg(0), pc.wrapping_add(ops.uimm(3)));
    cpu.set_pc(target);
    Ok(Flow::Taken)
}

// ========== 条件分支 ==========

pub fn beq(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    branch(cpu, ops, |a, b| a == b)
}

pub fn bne(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    branch(cpu, ops, |a, b| a != b)
}

pub fn blt(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    branch(cpu, ops, |a, b| (a as i64) < (b as i64))
}

pub fn bge(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    branch(cpu, ops, |a, b| (a as i64) >= (b as i64))
}

pub fn bltu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    branch(cpu, ops, |a, b| a < b)
}

pub fn bgeu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    branch(cpu, ops, |a, b| a >= b)
}

// ========== 访存 ==========

pub fn lb(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Byte, |v| v as u8 as i8 as i64 as u64)
}

pub fn lh(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Half, |v| v as u16 as i16 as i64 as u64)
}

pub fn lw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Word, sext32)
}

pub fn ld(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Double, |v| v)
}

pub fn lbu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Byte, |v| v)
}

pub fn lhu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Half, |v| v)
}

pub fn lwu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    load(cpu, ops, AccessSize::Word, |v| v)
}

pub fn sb(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    store(cpu, ops, AccessSize::Byte)
}

pub fn sh(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    store(cpu, ops, AccessSize::Half)
}

pub fn sw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    store(cpu, ops, AccessSize::Word)
}

pub fn sd(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    store(cpu, ops, AccessSize::Double)
}

// ========== I-type 立即数运算 ==========

pub fn addi(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, imm| a.wrapping_add(imm as u64))
}

pub fn slti(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, imm| u64::from((a as i64) < imm))
}

pub fn sltiu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |xlen, a, imm| u64::from(a < xlen.normalize(imm as u64)))
}

pub fn xori(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, imm| a ^ imm as u64)
}

pub fn ori(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, imm| a | imm as u64)
}

pub fn andi(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, imm| a & imm as u64)
}

pub fn slli(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |xlen, a, sh| a << (sh as u32 & xlen.shamt_mask()))
}

pub fn srli(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |xlen, a, sh| shift_right_logical(xlen, a, sh as u32 & xlen.shamt_mask()))
}

pub fn srai(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |xlen, a, sh| ((a as i64) >> (sh as u32 & xlen.shamt_mask())) as u64)
}

// ========== R-type 寄存器运算 ==========

pub fn add(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| a.wrapping_add(b))
}

pub fn sub(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| a.wrapping_sub(b))
}

pub fn sll(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |xlen, a, b| a << (b as u32 & xlen.shamt_mask()))
}

pub fn slt(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| u64::from((a as i64) < (b as i64)))
}

pub fn sltu(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| u64::from(a < b))
}

pub fn xor(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| a ^ b)
}

pub fn srl(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |xlen, a, b| shift_right_logical(xlen, a, b as u32 & xlen.shamt_mask()))
}

pub fn sra(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |xlen, a, b| ((a as i64) >> (b as u32 & xlen.shamt_mask())) as u64)
}

pub fn or(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| a | b)
}

pub fn and(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| a & b)
}

// ========== RV64 *W 指令 ==========

pub fn addiw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, imm| sext32(a.wrapping_add(imm as u64)))
}

pub fn slliw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, sh| sext32(u64::from((a as u32) << (sh as u32 & 0x1F))))
}

pub fn srliw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, sh| sext32(u64::from((a as u32) >> (sh as u32 & 0x1F))))
}

pub fn sraiw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    imm_op(cpu, ops, |_, a, sh| ((a as i32) >> (sh as u32 & 0x1F)) as i64 as u64)
}

pub fn addw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| sext32(a.wrapping_add(b)))
}

pub fn subw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| sext32(a.wrapping_sub(b)))
}

pub fn sllw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| sext32(u64::from((a as u32) << (b as u32 & 0x1F))))
}

pub fn srlw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| sext32(u64::from((a as u32) >> (b as u32 & 0x1F))))
}

pub fn sraw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    reg_op(cpu, ops, |_, a, b| ((a as i32) >> (b as u32 & 0x1F)) as i64 as u64)
}
