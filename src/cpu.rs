//! CPU 核心与分派循环
//!
//! 本模块定义单 hart 的 RISC-V CPU `Cpu`：
//! 取指（支持 16/32-bit 混合编码与跨页）、按当前 XLEN 选择解码树、
//! 执行绑定的 handler，并根据指令族决定 PC 的推进方式。

use std::sync::Arc;

use crate::isa::{InstrSize, Xlen};
use crate::memory::{AccessSize, Memory, MemoryMap};
use crate::mmu::{Access, IdentityTlb, PAGE_MASK, TranslationCache};

mod builder;
pub mod csr_def;
mod debug;
mod dispatch;
mod exu;
mod status;
pub mod trap;

pub use builder::CpuBuilder;
pub use debug::DebugInterface;
pub use dispatch::{
    BindError, Binding, Dispatch, ExecResult, Flow, Handler, HandlerDef, InstructionSet, IsaError, PcUpdate,
};
pub use exu::HANDLERS;
pub use status::{CsrEntry, StatusSnapshot};
pub use trap::{Exception, PrivilegeMode, TrapCause};

use csr_def::*;
use status::Status;
use trap::{calculate_trap_pc, mstatus};

/// `step` 提前返回的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 下一条指令的 PC 命中断点，该指令尚未执行
    Breakpoint(u64),
    /// 执行了 WFI，等待 `wake`
    WaitForInterrupt,
}

/// 一次 `step` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// 实际执行的指令数（包括产生 trap 的指令）
    pub executed: u64,
    pub stop: Option<StopReason>,
}

/// 单 hart CPU
///
/// 设计约定：
/// - x0 永远为 0，写入时丢弃
/// - RV32 下寄存器保存为低 32 位的符号扩展，PC 与地址只取低 32 位
/// - 解码树与 handler 绑定由 `InstructionSet` 提供，可在多个 CPU 间共享
pub struct Cpu {
    status: Status,
    pc: u64,
    xlen: Xlen,
    /// WFI 之后为 true，直到 `wake`/`reset`
    waiting: bool,
    /// 已执行指令数，同时作为 cycle/instret
    cycles: u64,
    isa: Arc<InstructionSet>,
    bus: MemoryMap,
    tlb: Box<dyn TranslationCache + Send>,
    debug: Option<DebugInterface>,
}

impl Cpu {
    /// 使用直接映射的地址翻译创建 CPU，复位到 `entry_pc`，RV64
    ///
    /// ```
    /// use std::sync::Arc;
    /// use r5emu::cpu::{Cpu, InstructionSet};
    /// use r5emu::memory::MemoryMap;
    ///
    /// let isa = Arc::new(InstructionSet::standard().unwrap());
    /// let cpu = Cpu::new(isa, MemoryMap::with_ram(0, 0x1000), 0x100);
    /// assert_eq!(cpu.pc(), 0x100);
    /// ```
    pub fn new(isa: Arc<InstructionSet>, bus: MemoryMap, entry_pc: u64) -> Self {
        Self::with_parts(isa, bus, Box::new(IdentityTlb::new()), Xlen::X64, entry_pc)
    }

    pub(crate) fn with_parts(
        isa: Arc<InstructionSet>,
        bus: MemoryMap,
        tlb: Box<dyn TranslationCache + Send>,
        xlen: Xlen,
        entry_pc: u64,
    ) -> Self {
        Cpu {
            status: Status::new(),
            pc: xlen.address(entry_pc),
            xlen,
            waiting: false,
            cycles: 0,
            isa,
            bus,
            tlb,
            debug: None,
        }
    }

    // ========== 执行 ==========

    /// 最多执行 `count` 条指令
    ///
    /// 遇到断点或 WFI 时提前返回；产生 trap 的指令也计入执行数。
    pub fn step(&mut self, count: u64) -> StepOutcome {
        let mut executed = 0;
        while executed < count {
            if self.waiting {
                return StepOutcome {
                    executed,
                    stop: Some(StopReason::WaitForInterrupt),
                };
            }
            if let Some(debug) = self.debug.as_mut() {
                if debug.should_break(self.pc) {
                    log::trace!("breakpoint hit at pc=0x{:x}", self.pc);
                    return StepOutcome {
                        executed,
                        stop: Some(StopReason::Breakpoint(self.pc)),
                    };
                }
            }
            self.interpret();
            self.cycles = self.cycles.wrapping_add(1);
            executed += 1;
        }
        StepOutcome { executed, stop: None }
    }

    /// 执行一条指令
    ///
    /// 1. 取指，失败时以当前 PC 触发取指异常
    /// 2. 按当前 XLEN 解码；非法编码触发非法指令异常，tval 为指令字
    /// 3. 空操作只推进 PC
    /// 4. 执行 handler；出错时 PC 回到本条指令再触发异常
    /// 5. 成功时按指令族决定是否 PC += 指令宽度
    fn interpret(&mut self) {
        let pc = self.pc;
        let raw = match self.fetch(pc) {
            Ok(raw) => raw,
            Err(cause) => {
                self.raise_exception(cause, pc);
                return;
            }
        };
        let next_pc = self.xlen.address(pc.wrapping_add(InstrSize::of(raw).bytes()));

        if log::log_enabled!(log::Level::Trace) {
            if let Some(app) = self.isa.disassemble(self.xlen, raw) {
                log::trace!("0x{:x}: {}", pc, app);
            }
        }

        match self.isa.dispatch(self.xlen, raw, pc) {
            Dispatch::Illegal => {
                log::trace!("illegal instruction 0x{:08x} at pc=0x{:x}", raw, pc);
                self.raise_exception(TrapCause::IllegalInstruction, u64::from(raw));
            }
            Dispatch::Nop => self.pc = next_pc,
            Dispatch::Execute { binding, operands } => match (binding.handler)(self, &operands) {
                Ok(flow) => {
                    if binding.pc_update.advances(flow) {
                        self.pc = next_pc;
                    }
                }
                Err(exception) => {
                    self.pc = pc;
                    let tval = if exception.cause == TrapCause::IllegalInstruction {
                        u64::from(raw)
                    } else {
                        exception.tval
                    };
                    self.raise_exception(exception.cause, tval);
                }
            },
        }
    }

    /// 取指：先读低 16 位，低两位为 `11` 时再读高 16 位
    ///
    /// 高半部分落在下一页时单独翻译。
    fn fetch(&mut self, pc: u64) -> Result<u32, TrapCause> {
        let phys = self.translate(pc, Access::Fetch)?;
        let low = u32::from(self.fetch_half(phys)?);
        if InstrSize::of(low) == InstrSize::Compressed {
            return Ok(low);
        }
        let next = self.xlen.address(pc.wrapping_add(2));
        let high_phys = if next & PAGE_MASK == 0 {
            self.translate(next, Access::Fetch)?
        } else {
            phys + 2
        };
        let high = u32::from(self.fetch_half(high_phys)?);
        Ok(low | (high << 16))
    }

    fn fetch_half(&self, phys: u64) -> Result<u16, TrapCause> {
        self.bus
            .load16(phys)
            .map_err(|e| TrapCause::from_mem(&e, Access::Fetch))
    }

    fn translate(&mut self, addr: u64, access: Access) -> Result<u64, TrapCause> {
        self.tlb
            .translate(&self.bus, addr, access)
            .map_err(|e| TrapCause::from_translate(&e))
    }

    // ========== 访存 ==========

    /// 读取数据，结果零扩展；异常的 tval 为虚拟地址
    pub fn load(&mut self, addr: u64, size: AccessSize) -> Result<u64, Exception> {
        let addr = self.xlen.address(addr);
        let phys = self
            .translate(addr, Access::Load)
            .map_err(|cause| Exception::new(cause, addr))?;
        self.bus
            .load(phys, size)
            .map_err(|e| Exception::new(TrapCause::from_mem(&e, Access::Load), addr))
    }

    /// 写入数据；异常的 tval 为虚拟地址
    pub fn store(&mut self, addr: u64, value: u64, size: AccessSize) -> Result<(), Exception> {
        let addr = self.xlen.address(addr);
        let phys = self
            .translate(addr, Access::Store)
            .map_err(|cause| Exception::new(cause, addr))?;
        self.bus
            .store(phys, value, size)
            .map_err(|e| Exception::new(TrapCause::from_mem(&e, Access::Store), addr))
    }

    /// 物理地址空间
    pub fn memory(&self) -> &MemoryMap {
        &self.bus
    }

    pub fn memory_mut(&mut self) -> &mut MemoryMap {
        &mut self.bus
    }

    // ========== 架构状态 ==========

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u64) {
        self.pc = self.xlen.address(pc);
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// 切换寄存器宽度，之后的解码使用对应宽度的解码树
    pub fn set_xlen(&mut self, xlen: Xlen) {
        if self.xlen == xlen {
            return;
        }
        log::debug!("switching {} -> {}", self.xlen, xlen);
        self.xlen = xlen;
        for reg in 1..32 {
            let value = self.status.int_read(reg);
            self.status.int_write(reg, xlen.normalize(value));
        }
        self.pc = xlen.address(self.pc);
    }

    /// 读取 x0 总是返回 0
    pub fn read_reg(&self, reg: usize) -> u64 {
        self.status.int_read(reg)
    }

    /// 写入值按当前 XLEN 规范化
    pub fn write_reg(&mut self, reg: usize, value: u64) {
        self.status.int_write(reg, self.xlen.normalize(value))
    }

    pub fn regs(&self) -> &[u64; 32] {
        self.status.int_snapshot()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn privilege(&self) -> PrivilegeMode {
        self.status.privilege
    }

    pub fn set_privilege(&mut self, mode: PrivilegeMode) {
        self.status.privilege = mode;
    }

    /// 已执行的指令数
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// misa：MXL、实现的扩展以及 S/U 模式
    pub fn isa(&self) -> u64 {
        let modes = (1 << (b'S' - b'A')) | (1 << (b'U' - b'A'));
        (self.xlen.mxl() << (self.xlen.bits() - 2)) | self.isa.misa_extensions() | modes
    }

    pub fn instruction_set(&self) -> &Arc<InstructionSet> {
        &self.isa
    }

    // ========== CSR ==========

    /// 不做权限检查的 CSR 读取；派生视图在这里计算
    pub fn csr_read(&self, addr: u16) -> u64 {
        let value = match addr {
            CSR_SSTATUS => self.status.csr_read(CSR_MSTATUS) & mstatus::SSTATUS_MASK,
            CSR_MISA => self.isa(),
            CSR_CYCLE | CSR_TIME | CSR_INSTRET | CSR_MCYCLE | CSR_MINSTRET => self.cycles,
            _ => self.status.csr_read(addr),
        };
        self.xlen.address(value)
    }

    /// 不做权限检查的 CSR 写入；只读位与只读 CSR 的写入被忽略
    pub fn csr_write(&mut self, addr: u16, value: u64) {
        match addr {
            CSR_MSTATUS => {
                let old = self.status.csr_read(CSR_MSTATUS);
                let mask = mstatus::WRITABLE_MASK;
                self.status.csr_write(CSR_MSTATUS, (old & !mask) | (value & mask));
            }
            CSR_SSTATUS => {
                let old = self.status.csr_read(CSR_MSTATUS);
                let mask = mstatus::SSTATUS_MASK & mstatus::WRITABLE_MASK;
                self.status.csr_write(CSR_MSTATUS, (old & !mask) | (value & mask));
            }
            CSR_MISA | CSR_CYCLE | CSR_TIME | CSR_INSTRET | CSR_MVENDORID | CSR_MARCHID | CSR_MIMPID
            | CSR_MHARTID => {}
            CSR_MCYCLE | CSR_MINSTRET => self.cycles = value,
            CSR_SATP => {
                self.status.csr_write(CSR_SATP, value);
                self.invalidate_caches();
            }
            _ => self.status.csr_write(addr, value),
        }
    }

    fn csr_exists(&self, addr: u16) -> bool {
        matches!(
            addr,
            CSR_SSTATUS | CSR_MISA | CSR_CYCLE | CSR_TIME | CSR_INSTRET | CSR_MCYCLE | CSR_MINSTRET
        ) || self.status.csr.contains(addr)
    }

    fn check_csr(&self, addr: u16, write: bool) -> Result<(), Exception> {
        let allowed = self.csr_exists(addr)
            && self.status.privilege.to_bits() >= required_privilege(addr)
            && !(write && is_read_only(addr));
        if allowed { Ok(()) } else { Err(Exception::illegal()) }
    }

    /// CSR 指令使用的读取：不存在或权限不足时为非法指令
    pub fn read_csr(&self, addr: u16) -> Result<u64, Exception> {
        self.check_csr(addr, false)?;
        Ok(self.csr_read(addr))
    }

    /// CSR 指令使用的写入：不存在、只读或权限不足时为非法指令
    pub fn write_csr(&mut self, addr: u16, value: u64) -> Result<(), Exception> {
        self.check_csr(addr, true)?;
        self.csr_write(addr, value);
        Ok(())
    }

    // ========== Trap ==========

    /// 触发同步异常
    ///
    /// 1. 当前特权级不高于 S 且 medeleg 对应位置位时委托给 S-mode
    /// 2. 保存 PC 到 xepc，原因到 xcause，额外信息到 xtval
    /// 3. xPIE = xIE，xIE = 0，xPP = 当前特权级
    /// 4. 切换特权级并跳转到 xtvec
    pub fn raise_exception(&mut self, cause: TrapCause, tval: u64) {
        let epc = self.pc;
        let code = cause.code();
        let privilege = self.status.privilege;
        let delegated =
            privilege <= PrivilegeMode::Supervisor && (self.status.csr_read(CSR_MEDELEG) >> code) & 1 != 0;

        log::trace!(
            "trap {:?} at pc=0x{:x} tval=0x{:x} from {:?}{}",
            cause,
            epc,
            tval,
            privilege,
            if delegated { " (delegated)" } else { "" }
        );

        let status = self.status.csr_read(CSR_MSTATUS);
        if delegated {
            self.status.csr_write(CSR_SEPC, epc);
            self.status.csr_write(CSR_SCAUSE, code);
            self.status.csr_write(CSR_STVAL, tval);
            let status = mstatus::copy_bit(status, mstatus::SIE_MASK, mstatus::SPIE_MASK) & !mstatus::SIE_MASK;
            let spp = u64::from(privilege != PrivilegeMode::User);
            self.status.csr_write(CSR_MSTATUS, mstatus::write_spp(status, spp));
            self.status.privilege = PrivilegeMode::Supervisor;
            self.pc = calculate_trap_pc(self.status.csr_read(CSR_STVEC));
        } else {
            self.status.csr_write(CSR_MEPC, epc);
            self.status.csr_write(CSR_MCAUSE, code);
            self.status.csr_write(CSR_MTVAL, tval);
            let status = mstatus::copy_bit(status, mstatus::MIE_MASK, mstatus::MPIE_MASK) & !mstatus::MIE_MASK;
            self.status.csr_write(CSR_MSTATUS, mstatus::write_mpp(status, privilege.to_bits()));
            self.status.privilege = PrivilegeMode::Machine;
            self.pc = calculate_trap_pc(self.status.csr_read(CSR_MTVEC));
        }
        self.pc = self.xlen.address(self.pc);
    }

    // ========== 控制 ==========

    /// 复位：PC、特权级与等待状态总是复位；`hard` 时同时清空寄存器与 CSR
    pub fn reset(&mut self, hard: bool, pc: u64) {
        log::debug!("{} reset, pc=0x{:x}", if hard { "hard" } else { "soft" }, pc);
        if hard {
            self.status = Status::new();
            self.cycles = 0;
        }
        self.status.privilege = PrivilegeMode::Machine;
        self.waiting = false;
        self.pc = self.xlen.address(pc);
        self.invalidate_caches();
    }

    /// 丢弃地址翻译缓存
    pub fn invalidate_caches(&mut self) {
        self.tlb.invalidate();
    }

    /// 进入等待状态，`step` 在下一次取指前返回
    pub(crate) fn wait_for_interrupt(&mut self) {
        self.waiting = true;
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// 离开 WFI 等待状态
    pub fn wake(&mut self) {
        self.waiting = false;
    }

    // ========== 调试 ==========

    /// 启用调试接口并返回它
    pub fn enable_debugger(&mut self) -> &mut DebugInterface {
        self.debug.get_or_insert_with(DebugInterface::new)
    }

    pub fn disable_debugger(&mut self) {
        self.debug = None;
    }

    pub fn debugger(&self) -> Option<&DebugInterface> {
        self.debug.as_ref()
    }

    pub fn debugger_mut(&mut self) -> Option<&mut DebugInterface> {
        self.debug.as_mut()
    }

    /// 打印全部架构状态（用于调试）
    pub fn dump_regs(&self) {
        println!("═══════════════════════════════════════════════════════════════════");
        println!("CPU Status Dump ({})", self.xlen);
        println!("═══════════════════════════════════════════════════════════════════");

        println!(
            "PC: 0x{:016x}  Privilege: {:?}  Cycles: {}{}",
            self.pc,
            self.status.privilege,
            self.cycles,
            if self.waiting { "  (waiting)" } else { "" }
        );
        println!();

        println!("─── Integer Registers (x0-x31) ───────────────────────────────────");
        for i in 0..32 {
            if i % 4 == 0 {
                print!("  ");
            }
            print!("x{:02}: 0x{:016x}  ", i, self.read_reg(i));
            if i % 4 == 3 {
                println!();
            }
        }

        let csr_snapshot = self.status.csr.snapshot();
        if !csr_snapshot.is_empty() {
            println!();
            println!("─── Control and Status Registers (CSR) ───────────────────────────");
            let mut csr_list: Vec<_> = csr_snapshot.iter().collect();
            csr_list.sort_by_key(|(addr, _)| **addr);
            for (i, (addr, value)) in csr_list.iter().enumerate() {
                let name = csr_name(**addr).unwrap_or("?");
                print!("  {:>10}: 0x{:016x}", name, value);
                if i % 2 == 1 {
                    println!();
                }
            }
            if csr_list.len() % 2 != 0 {
                println!();
            }
        }

        println!("═══════════════════════════════════════════════════════════════════");
    }
}

#[cfg(test)]
mod tests;
