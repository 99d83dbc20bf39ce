//! CPU 配置器
//!
//! 统一配置 CPU 的寄存器宽度、指令集、物理内存、地址翻译与调试接口。
//!
//! # 示例
//!
//! ```
//! use r5emu::cpu::CpuBuilder;
//! use r5emu::isa::Xlen;
//!
//! let cpu = CpuBuilder::new(0x1000)
//!     .with_xlen(Xlen::X32)
//!     .with_ram(0, 0x10000)
//!     .build()
//!     .expect("内置指令集可以构建");
//! assert_eq!(cpu.pc(), 0x1000);
//! ```

use std::sync::Arc;

use super::dispatch::{InstructionSet, IsaError};
use super::Cpu;
use super::DebugInterface;
use crate::isa::Xlen;
use crate::memory::MemoryMap;
use crate::mmu::{IdentityTlb, TranslationCache};

/// CPU 构建器
///
/// 未指定时：
/// - RV64
/// - 内置指令集（每次 `build` 重新构建解码树）
/// - 空的物理地址空间
/// - 直接映射的地址翻译
pub struct CpuBuilder {
    entry_pc: u64,
    xlen: Xlen,
    isa: Option<Arc<InstructionSet>>,
    bus: MemoryMap,
    tlb: Option<Box<dyn TranslationCache + Send>>,
    debugger: bool,
}

impl CpuBuilder {
    pub fn new(entry_pc: u64) -> Self {
        Self {
            entry_pc,
            xlen: Xlen::X64,
            isa: None,
            bus: MemoryMap::new(),
            tlb: None,
            debugger: false,
        }
    }

    pub fn with_xlen(mut self, xlen: Xlen) -> Self {
        self.xlen = xlen;
        self
    }

    /// 共享一个已构建的指令集
    pub fn with_instruction_set(mut self, isa: Arc<InstructionSet>) -> Self {
        self.isa = Some(isa);
        self
    }

    pub fn with_memory(mut self, bus: MemoryMap) -> Self {
        self.bus = bus;
        self
    }

    /// 以一段 RAM 作为物理地址空间
    pub fn with_ram(mut self, base: u64, size: usize) -> Self {
        self.bus = MemoryMap::with_ram(base, size);
        self
    }

    pub fn with_translation(mut self, tlb: Box<dyn TranslationCache + Send>) -> Self {
        self.tlb = Some(tlb);
        self
    }

    /// 启用调试接口（断点）
    pub fn with_debugger(mut self) -> Self {
        self.debugger = true;
        self
    }

    /// 构建 CPU
    ///
    /// 返回 `Err` 如果内置指令集无法构建
    pub fn build(self) -> Result<Cpu, IsaError> {
        let isa = match self.isa {
            Some(isa) => isa,
            None => Arc::new(InstructionSet::standard()?),
        };
        let tlb = self.tlb.unwrap_or_else(|| Box::new(IdentityTlb::new()));
        let mut cpu = Cpu::with_parts(isa, self.bus, tlb, self.xlen, self.entry_pc);
        if self.debugger {
            cpu.debug = Some(DebugInterface::new());
        }
        log::debug!("cpu built: {} entry=0x{:x}", self.xlen, self.entry_pc);
        Ok(cpu)
    }
}

impl Default for CpuBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}
