//! 特权指令执行单元
//!
//! ECALL/EBREAK 产生同步异常；MRET/SRET 从 trap handler 返回；
//! WFI 让 `step` 停下；SFENCE.VMA 丢弃地址翻译缓存。

use super::super::csr_def::{CSR_MEPC, CSR_MSTATUS, CSR_SEPC};
use super::super::dispatch::{ExecResult, Flow};
use super::super::trap::{mstatus, Exception, PrivilegeMode, TrapCause};
use super::super::Cpu;
use crate::isa::Operands;

/// 按当前特权级产生 ECALL 异常，tval = 0
pub fn ecall(cpu: &mut Cpu, _ops: &Operands) -> ExecResult {
    let cause = TrapCause::ecall_from(cpu.privilege());
    cpu.raise_exception(cause, 0);
    Ok(Flow::Next)
}

/// 断点异常，tval 为断点指令的 PC；操作数 `[pc]`
pub fn ebreak(_cpu: &mut Cpu, ops: &Operands) -> ExecResult {
    Err(Exception::new(TrapCause::Breakpoint, ops.uimm(0)))
}

/// MRET：从 M-mode trap handler 返回
///
/// 执行流程：
/// 1. MIE = MPIE
/// 2. 特权级 = MPP
/// 3. MPIE = 1，MPP = U
/// 4. MPP 不是 M 时清除 MPRV
/// 5. PC = mepc
pub fn mret(cpu: &mut Cpu, _ops: &Operands) -> ExecResult {
    if cpu.privilege() < PrivilegeMode::Machine {
        return Err(Exception::illegal());
    }
    let status = cpu.csr_read(CSR_MSTATUS);
    let mpp = PrivilegeMode::from_bits(mstatus::read_mpp(status));

    let mut status = mstatus::copy_bit(status, mstatus::MPIE_MASK, mstatus::MIE_MASK);
    status |= mstatus::MPIE_MASK;
    status = mstatus::write_mpp(status, PrivilegeMode::User.to_bits());
    if mpp != PrivilegeMode::Machine {
        status &= !mstatus::MPRV_MASK;
    }
    cpu.csr_write(CSR_MSTATUS, status);

    cpu.set_privilege(mpp);
    let mepc = cpu.csr_read(CSR_MEPC);
    cpu.set_pc(mepc & !1);
    Ok(Flow::Next)
}

/// SRET：从 S-mode trap handler 返回
///
/// 类似 MRET，但操作 SIE/SPIE/SPP 和 sepc；mstatus.TSR 置位时 S-mode 下非法。
pub fn sret(cpu: &mut Cpu, _ops: &Operands) -> ExecResult {
    let privilege = cpu.privilege();
    let status = cpu.csr_read(CSR_MSTATUS);
    if privilege < PrivilegeMode::Supervisor
        || (privilege == PrivilegeMode::Supervisor && status & mstatus::TSR_MASK != 0)
    {
        return Err(Exception::illegal());
    }
    let spp = if mstatus::read_spp(status) == 0 {
        PrivilegeMode::User
    } else {
        PrivilegeMode::Supervisor
    };

    let mut status = mstatus::copy_bit(status, mstatus::SPIE_MASK, mstatus::SIE_MASK);
    status |= mstatus::SPIE_MASK;
    status = mstatus::write_spp(status, 0);
    // SRET 总是返回到低于 M 的特权级
    status &= !mstatus::MPRV_MASK;
    cpu.csr_write(CSR_MSTATUS, status);

    cpu.set_privilege(spp);
    let sepc = cpu.csr_read(CSR_SEPC);
    cpu.set_pc(sepc & !1);
    Ok(Flow::Next)
}

/// WFI：等待中断
///
/// mstatus.TW 置位时低于 M-mode 执行为非法指令。
pub fn wfi(cpu: &mut Cpu, _ops: &Operands) -> ExecResult {
    let tw = cpu.csr_read(CSR_MSTATUS) & mstatus::TW_MASK != 0;
    if tw && cpu.privilege() < PrivilegeMode::Machine {
        return Err(Exception::illegal());
    }
    cpu.wait_for_interrupt();
    Ok(Flow::Next)
}

/// SFENCE.VMA：丢弃翻译缓存；U-mode 或 TVM 置位的 S-mode 下非法
pub fn sfence_vma(cpu: &mut Cpu, _ops: &Operands) -> ExecResult {
    let privilege = cpu.privilege();
    let tvm = cpu.csr_read(CSR_MSTATUS) & (1 << mstatus::TVM) != 0;
    if privilege < PrivilegeMode::Supervisor || (privilege == PrivilegeMode::Supervisor && tvm) {
        return Err(Exception::illegal());
    }
    cpu.invalidate_caches();
    Ok(Flow::Next)
}
