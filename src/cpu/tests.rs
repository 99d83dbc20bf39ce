use std::sync::Arc;

use super::csr_def::*;
use super::trap::mstatus;
use super::*;
use crate::isa::Xlen;
use crate::mmu::PageMapTlb;

fn cpu_with(xlen: Xlen) -> Cpu {
    CpuBuilder::new(0x1000)
        .with_xlen(xlen)
        .with_ram(0, 0x10000)
        .build()
        .unwrap()
}

fn cpu64() -> Cpu {
    cpu_with(Xlen::X64)
}

fn write_instr(cpu: &mut Cpu, addr: u64, raw: u32) {
    cpu.memory_mut().write_bytes(addr, &raw.to_le_bytes()).unwrap();
}

fn write_half(cpu: &mut Cpu, addr: u64, raw: u16) {
    cpu.memory_mut().write_bytes(addr, &raw.to_le_bytes()).unwrap();
}

// ========== 分派循环 ==========

#[test]
fn test_sequential_add() {
    let mut cpu = cpu64();
    // add x2, x2, x5
    write_instr(&mut cpu, 0x1000, 0x00510133);
    cpu.write_reg(2, 3);
    cpu.write_reg(5, 4);
    let outcome = cpu.step(1);
    assert_eq!(outcome, StepOutcome { executed: 1, stop: None });
    assert_eq!(cpu.read_reg(2), 7);
    assert_eq!(cpu.pc(), 0x1004);
    assert_eq!(cpu.cycles(), 1);
}

#[test]
fn test_compressed_advances_two() {
    let mut cpu = cpu64();
    // c.addi x1, 1
    write_half(&mut cpu, 0x1000, 0x0085);
    cpu.write_reg(1, 41);
    cpu.step(1);
    assert_eq!(cpu.read_reg(1), 42);
    assert_eq!(cpu.pc(), 0x1002);
}

#[test]
fn test_branch_taken_and_not_taken() {
    let mut cpu = cpu64();
    // beq x1, x2, 8
    write_instr(&mut cpu, 0x1000, 0x00208463);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x1008);

    cpu.set_pc(0x1000);
    cpu.write_reg(1, 1);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x1004);
}

#[test]
fn test_jal_links_return_address() {
    let mut cpu = cpu64();
    // jal x1, 8
    write_instr(&mut cpu, 0x1000, 0x008000EF);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x1008);
    assert_eq!(cpu.read_reg(1), 0x1004);
}

#[test]
fn test_jalr_same_register() {
    let mut cpu = cpu64();
    // jalr x1, 0(x1)
    write_instr(&mut cpu, 0x1000, 0x000080E7);
    cpu.write_reg(1, 0x2001);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x2000);
    assert_eq!(cpu.read_reg(1), 0x1004);
}

#[test]
fn test_nop_declarations_advance() {
    let mut cpu = cpu64();
    // c.nop; fence
    write_half(&mut cpu, 0x1000, 0x0001);
    write_instr(&mut cpu, 0x1002, 0x0000000F);
    cpu.step(2);
    assert_eq!(cpu.pc(), 0x1006);
    assert_eq!(cpu.regs(), &[0; 32]);
}

#[test]
fn test_step_count() {
    let mut cpu = cpu64();
    for i in 0..10 {
        // addi x1, x1, 1
        write_instr(&mut cpu, 0x1000 + i * 4, 0x00108093);
    }
    let outcome = cpu.step(5);
    assert_eq!(outcome.executed, 5);
    assert_eq!(cpu.read_reg(1), 5);
    assert_eq!(cpu.cycles(), 5);
    assert_eq!(cpu.pc(), 0x1014);
}

#[test]
fn test_load_store_word() {
    let mut cpu = cpu64();
    // sw x2, 0(x1); lw x3, 0(x1)
    write_instr(&mut cpu, 0x1000, 0x0020A023);
    write_instr(&mut cpu, 0x1004, 0x0000A183);
    cpu.write_reg(1, 0x800);
    cpu.write_reg(2, 0x8000_0000);
    cpu.step(2);
    assert_eq!(cpu.read_reg(3), 0xFFFF_FFFF_8000_0000);
}

#[test]
fn test_div_by_zero() {
    let mut cpu = cpu64();
    // div x3, x1, x2; rem x4, x1, x2
    write_instr(&mut cpu, 0x1000, 0x0220C1B3);
    write_instr(&mut cpu, 0x1004, 0x0220E233);
    cpu.write_reg(1, 7);
    cpu.step(2);
    assert_eq!(cpu.read_reg(3), u64::MAX);
    assert_eq!(cpu.read_reg(4), 7);
}

// ========== 取指 ==========

#[test]
fn test_fetch_across_page_boundary() {
    let mut tlb = PageMapTlb::new();
    tlb.map(0x0000, 0x5000);
    tlb.map(0x1000, 0x2000);
    let mut cpu = CpuBuilder::new(0xFFE)
        .with_ram(0, 0x10000)
        .with_translation(Box::new(tlb))
        .build()
        .unwrap();
    // addi x1, x0, 42 的两个半字落在不连续的物理页
    write_half(&mut cpu, 0x5FFE, 0x0093);
    write_half(&mut cpu, 0x2000, 0x02A0);
    cpu.step(1);
    assert_eq!(cpu.read_reg(1), 42);
    assert_eq!(cpu.pc(), 0x1002);
}

#[test]
fn test_fetch_fault_on_second_page() {
    let mut tlb = PageMapTlb::new();
    tlb.map(0x0000, 0x5000);
    let mut cpu = CpuBuilder::new(0xFFE)
        .with_ram(0, 0x10000)
        .with_translation(Box::new(tlb))
        .build()
        .unwrap();
    write_half(&mut cpu, 0x5FFE, 0x0093);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), TrapCause::InstructionPageFault.code());
    assert_eq!(cpu.csr_read(CSR_MEPC), 0xFFE);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0xFFE);
    assert_eq!(cpu.read_reg(1), 0);
}

#[test]
fn test_fetch_outside_memory() {
    let mut cpu = cpu64();
    cpu.set_pc(0x20000);
    cpu.csr_write(CSR_MTVEC, 0x1000);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), TrapCause::InstructionAccessFault.code());
    assert_eq!(cpu.csr_read(CSR_MEPC), 0x20000);
    assert_eq!(cpu.pc(), 0x1000);
}

// ========== 非法指令与异常 ==========

#[test]
fn test_zero_word_is_illegal() {
    let mut cpu = cpu64();
    cpu.csr_write(CSR_MTVEC, 0x8000);
    let outcome = cpu.step(1);
    assert_eq!(outcome.executed, 1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0);
    assert_eq!(cpu.csr_read(CSR_MEPC), 0x1000);
    assert_eq!(cpu.pc(), 0x8000);
}

#[test]
fn test_illegal_tval_is_instruction_word() {
    let mut cpu = cpu64();
    write_instr(&mut cpu, 0x1000, 0xFFFF_FFFF);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0xFFFF_FFFF);
}

#[test]
fn test_compressed_addiw_x0_traps_on_rv64() {
    let mut cpu = cpu64();
    cpu.csr_write(CSR_MTVEC, 0x8000);
    // c.addiw x0, 1
    write_half(&mut cpu, 0x1000, 0x2005);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0x2005);
    assert_eq!(cpu.csr_read(CSR_MEPC), 0x1000);
    assert_eq!(cpu.read_reg(0), 0);

    // RV32 下同一编码是 c.jal 32
    let mut cpu = cpu_with(Xlen::X32);
    write_half(&mut cpu, 0x1000, 0x2005);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x1020);
    assert_eq!(cpu.read_reg(1), 0x1002);
}

#[test]
fn test_ecall_from_machine() {
    let mut cpu = cpu64();
    write_instr(&mut cpu, 0x1000, 0x00000073);
    cpu.csr_write(CSR_MTVEC, 0x8000);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x8000);
    assert_eq!(cpu.csr_read(CSR_MEPC), 0x1000);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 11);
    assert_eq!(cpu.privilege(), PrivilegeMode::Machine);
}

#[test]
fn test_ebreak_reports_pc() {
    let mut cpu = cpu64();
    write_instr(&mut cpu, 0x1000, 0x00100073);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 3);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0x1000);
    assert_eq!(cpu.csr_read(CSR_MEPC), 0x1000);
}

#[test]
fn test_load_fault_rolls_back() {
    let mut cpu = cpu64();
    // ld x1, 0(x2)
    write_instr(&mut cpu, 0x1000, 0x00013083);
    cpu.write_reg(1, 0x55);
    cpu.write_reg(2, 0x10_0000);
    cpu.csr_write(CSR_MTVEC, 0x8000);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), TrapCause::LoadAccessFault.code());
    assert_eq!(cpu.csr_read(CSR_MEPC), 0x1000);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0x10_0000);
    assert_eq!(cpu.read_reg(1), 0x55);
    assert_eq!(cpu.pc(), 0x8000);
}

#[test]
fn test_trap_saves_previous_privilege() {
    let mut cpu = cpu64();
    cpu.csr_write(CSR_MSTATUS, mstatus::MIE_MASK);
    cpu.set_privilege(PrivilegeMode::User);
    cpu.step(1);
    let status = cpu.csr_read(CSR_MSTATUS);
    assert_eq!(mstatus::read_mpp(status), PrivilegeMode::User.to_bits());
    assert_ne!(status & mstatus::MPIE_MASK, 0);
    assert_eq!(status & mstatus::MIE_MASK, 0);
    assert_eq!(cpu.privilege(), PrivilegeMode::Machine);
}

#[test]
fn test_medeleg_delegates_to_supervisor() {
    let mut cpu = cpu64();
    cpu.csr_write(CSR_MEDELEG, 1 << TrapCause::IllegalInstruction.code());
    cpu.csr_write(CSR_STVEC, 0x3000);
    cpu.set_privilege(PrivilegeMode::User);
    cpu.step(1);
    assert_eq!(cpu.privilege(), PrivilegeMode::Supervisor);
    assert_eq!(cpu.pc(), 0x3000);
    assert_eq!(cpu.csr_read(CSR_SCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_SEPC), 0x1000);
    assert_eq!(mstatus::read_spp(cpu.csr_read(CSR_MSTATUS)), 0);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 0);
}

#[test]
fn test_medeleg_ignored_in_machine_mode() {
    let mut cpu = cpu64();
    cpu.csr_write(CSR_MEDELEG, 1 << TrapCause::IllegalInstruction.code());
    cpu.csr_write(CSR_MTVEC, 0x8000);
    cpu.step(1);
    assert_eq!(cpu.privilege(), PrivilegeMode::Machine);
    assert_eq!(cpu.pc(), 0x8000);
}

// ========== 特权指令 ==========

#[test]
fn test_mret_returns_to_mpp() {
    let mut cpu = cpu64();
    // mret
    write_instr(&mut cpu, 0x1000, 0x30200073);
    cpu.csr_write(CSR_MEPC, 0x2000);
    cpu.csr_write(CSR_MSTATUS, mstatus::MPIE_MASK);
    cpu.step(1);
    assert_eq!(cpu.pc(), 0x2000);
    assert_eq!(cpu.privilege(), PrivilegeMode::User);
    let status = cpu.csr_read(CSR_MSTATUS);
    assert_ne!(status & mstatus::MIE_MASK, 0);
    assert_ne!(status & mstatus::MPIE_MASK, 0);
}

#[test]
fn test_mret_illegal_below_machine() {
    let mut cpu = cpu64();
    write_instr(&mut cpu, 0x1000, 0x30200073);
    cpu.set_privilege(PrivilegeMode::User);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0x30200073);
}

#[test]
fn test_wfi_stops_step() {
    let mut cpu = cpu64();
    // wfi; addi x1, x1, 1
    write_instr(&mut cpu, 0x1000, 0x10500073);
    write_instr(&mut cpu, 0x1004, 0x00108093);
    let outcome = cpu.step(10);
    assert_eq!(outcome, StepOutcome { executed: 1, stop: Some(StopReason::WaitForInterrupt) });
    assert!(cpu.is_waiting());
    assert_eq!(cpu.step(10).executed, 0);

    cpu.wake();
    cpu.step(1);
    assert_eq!(cpu.read_reg(1), 1);
}

// ========== CSR ==========

#[test]
fn test_csrrw_swaps() {
    let mut cpu = cpu64();
    // csrrw x5, mscratch, x6
    write_instr(&mut cpu, 0x1000, 0x340312F3);
    cpu.csr_write(CSR_MSCRATCH, 0x11);
    cpu.write_reg(6, 0xAB);
    cpu.step(1);
    assert_eq!(cpu.read_reg(5), 0x11);
    assert_eq!(cpu.csr_read(CSR_MSCRATCH), 0xAB);
}

#[test]
fn test_csr_privilege_check() {
    let mut cpu = cpu64();
    // csrr x5, mstatus
    write_instr(&mut cpu, 0x1000, 0x300022F3);
    cpu.set_privilege(PrivilegeMode::User);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0x300022F3);
    assert_eq!(cpu.read_reg(5), 0);
}

#[test]
fn test_csr_read_only_write() {
    let mut cpu = cpu64();
    // csrrw x0, mhartid, x1
    write_instr(&mut cpu, 0x1000, 0xF1409073);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
}

#[test]
fn test_csr_views() {
    let mut cpu = cpu64();
    cpu.csr_write(CSR_MSTATUS, mstatus::SIE_MASK | mstatus::MIE_MASK);
    assert_eq!(cpu.csr_read(CSR_SSTATUS), mstatus::SIE_MASK);
    cpu.csr_write(CSR_SSTATUS, 0);
    assert_eq!(cpu.csr_read(CSR_MSTATUS), mstatus::MIE_MASK);

    write_instr(&mut cpu, 0x1000, 0x00108093);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_CYCLE), 1);
    assert_eq!(cpu.csr_read(CSR_MINSTRET), 1);
}

#[test]
fn test_misa_reports_extensions() {
    let cpu = cpu64();
    let misa = cpu.isa();
    assert_eq!(misa >> 62, 2);
    for letter in [b'I', b'M', b'C', b'S', b'U'] {
        assert_ne!(misa & (1 << (letter - b'A')), 0, "missing {}", letter as char);
    }
    assert_eq!(cpu.csr_read(CSR_MISA), misa);

    let cpu = cpu_with(Xlen::X32);
    assert_eq!(cpu.isa() >> 30, 1);
}

// ========== XLEN ==========

#[test]
fn test_rv32_normalization() {
    let mut cpu = cpu_with(Xlen::X32);
    // addi x1, x1, 1
    write_instr(&mut cpu, 0x1000, 0x00108093);
    cpu.write_reg(1, 0x7FFF_FFFF);
    cpu.step(1);
    assert_eq!(cpu.read_reg(1), 0xFFFF_FFFF_8000_0000);
}

#[test]
fn test_width_switch_changes_decoding() {
    let mut cpu = cpu64();
    // slli x1, x1, 33
    write_instr(&mut cpu, 0x1000, 0x02109093);
    cpu.write_reg(1, 1);
    cpu.step(1);
    assert_eq!(cpu.read_reg(1), 1 << 33);

    cpu.reset(false, 0x1000);
    cpu.set_xlen(Xlen::X32);
    assert_eq!(cpu.read_reg(1), 0);
    cpu.step(1);
    assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    assert_eq!(cpu.csr_read(CSR_MTVAL), 0x02109093);
}

// ========== 调试与共享 ==========

#[test]
fn test_breakpoint_stops_before_execution() {
    let mut cpu = cpu64();
    write_instr(&mut cpu, 0x1000, 0x00108093);
    write_instr(&mut cpu, 0x1004, 0x00108093);
    cpu.enable_debugger().add_breakpoint(0x1004);

    let outcome = cpu.step(10);
    assert_eq!(outcome, StepOutcome { executed: 1, stop: Some(StopReason::Breakpoint(0x1004)) });
    assert_eq!(cpu.read_reg(1), 1);

    let outcome = cpu.step(1);
    assert_eq!(outcome.executed, 1);
    assert_eq!(cpu.pc(), 0x1008);
    assert_eq!(cpu.read_reg(1), 2);
}

#[test]
fn test_shared_instruction_set() {
    let isa = Arc::new(InstructionSet::standard().unwrap());
    let mut a = CpuBuilder::new(0)
        .with_instruction_set(Arc::clone(&isa))
        .with_ram(0, 0x1000)
        .build()
        .unwrap();
    let b = CpuBuilder::new(0)
        .with_instruction_set(Arc::clone(&isa))
        .with_xlen(Xlen::X32)
        .with_ram(0, 0x1000)
        .build()
        .unwrap();
    assert_eq!(Arc::strong_count(&isa), 3);
    assert!(Arc::ptr_eq(a.instruction_set(), b.instruction_set()));

    write_instr(&mut a, 0, 0x00108093);
    a.step(1);
    assert_eq!(a.read_reg(1), 1);
    assert_eq!(b.read_reg(1), 0);
}

#[test]
fn test_hard_reset_clears_state() {
    let mut cpu = cpu64();
    cpu.write_reg(3, 9);
    cpu.csr_write(CSR_MSCRATCH, 1);
    cpu.set_privilege(PrivilegeMode::User);
    cpu.reset(true, 0x2000);
    assert_eq!(cpu.read_reg(3), 0);
    assert_eq!(cpu.csr_read(CSR_MSCRATCH), 0);
    assert_eq!(cpu.privilege(), PrivilegeMode::Machine);
    assert_eq!(cpu.pc(), 0x2000);
}
