//! Zicsr 扩展执行单元
//!
//! 操作数布局 `[rd, rs1 | zimm, csr]`。
//! 读与写都经过权限检查；rd 在 CSR 写入之后才写回。

use super::super::dispatch::{ExecResult, Flow};
use super::super::Cpu;
use crate::isa::Operands;

#[inline]
fn csr_addr(ops: &Operands) -> u16 {
    (ops.uimm(2) & 0xFFF) as u16
}

/// CSRRW/CSRRWI: t = CSR[csr]; CSR[csr] = src; rd = t
///
/// rd = x0 时不读取 CSR。
fn swap(cpu: &mut Cpu, ops: &Operands, src: u64) -> ExecResult {
    let rd = ops.reg(0);
    let csr = csr_addr(ops);
    let old = if rd != 0 { Some(cpu.read_csr(csr)?) } else { None };
    cpu.write_csr(csr, src)?;
    if let Some(old) = old {
        cpu.write_reg(rd, old);
    }
    Ok(Flow::Next)
}

/// CSRRS/CSRRC 及立即数形式：t = CSR[csr]; CSR[csr] = f(t); rd = t
///
/// 源为 0（x0 或 zimm = 0）时只读不写。
fn modify(cpu: &mut Cpu, ops: &Operands, write: bool, f: impl FnOnce(u64) -> u64) -> ExecResult {
    let csr = csr_addr(ops);
    let old = cpu.read_csr(csr)?;
    if write {
        cpu.write_csr(csr, f(old))?;
    }
    cpu.write_reg(ops.reg(0), old);
    Ok(Flow::Next)
}

pub fn csrrw(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let src = cpu.read_reg(ops.reg(1));
    swap(cpu, ops, src)
}

pub fn csrrs(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let rs1 = ops.reg(1);
    let src = cpu.read_reg(rs1);
    modify(cpu, ops, rs1 != 0, |old| old | src)
}

pub fn csrrc(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let rs1 = ops.reg(1);
    let src = cpu.read_reg(rs1);
    modify(cpu, ops, rs1 != 0, |old| old & !src)
}

pub fn csrrwi(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    swap(cpu, ops, ops.uimm(1))
}

pub fn csrrsi(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let zimm = ops.uimm(1);
    modify(cpu, ops, zimm != 0, |old| old | zimm)
}

pub fn csrrci(cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    let zimm = ops.uimm(1);
    modify(cpu, ops, zimm != 0, |old| old & !zimm)
}
