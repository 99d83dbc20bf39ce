//! 仿真环境初始化模块
//!
//! 本模块负责：
//! - 读取仿真配置
//! - 初始化物理内存与 CPU
//! - 将原始二进制镜像加载到内存
//! - 运行程序，并通过 riscv-tests 风格的 tohost 邮箱判断测试结果
//!
//! # 示例
//!
//! ```no_run
//! use r5emu::sim_env::{SimConfig, SimEnv};
//!
//! let config = SimConfig::new()
//!     .with_image("program.bin", 0x8000_0000)
//!     .with_memory(0x8000_0000, 64 * 1024)
//!     .with_tohost(0x8000_1000);
//!
//! let mut env = SimEnv::from_config(config).expect("Failed to create sim env");
//! let (result, executed) = env.run_isa_test(1_000_000);
//! println!("{:?} after {} instructions", result, executed);
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::cpu::{Cpu, CpuBuilder, IsaError, StepOutcome};
use crate::isa::Xlen;
use crate::memory::{MemError, Memory, MemoryMap};

/// run_isa_test 每批执行的指令数，批与批之间检查 tohost
const TOHOST_POLL_INTERVAL: u64 = 1000;

/// run_isa_test 的默认指令上限
const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// 仿真环境错误
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read image {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image of {len} bytes at 0x{addr:x} does not fit in memory")]
    ImageOutOfRange { addr: u64, len: usize },

    #[error(transparent)]
    Memory(#[from] MemError),

    #[error(transparent)]
    Isa(#[from] IsaError),
}

/// 仿真配置
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RAM 起始物理地址
    pub memory_base: u64,
    /// RAM 大小（字节）
    pub memory_size: usize,
    /// 原始二进制镜像
    pub image_path: Option<PathBuf>,
    /// 镜像加载地址，未指定时为 RAM 起始地址
    pub load_addr: Option<u64>,
    /// 入口 PC，未指定时为镜像加载地址
    pub entry_pc: Option<u64>,
    pub xlen: Xlen,
    /// 最大执行指令数（0 表示使用默认值）
    pub max_steps: u64,
    /// HTIF tohost 地址（用于 ISA 测试）
    pub tohost: Option<u64>,
    /// HTIF fromhost 地址
    pub fromhost: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_base: 0,
            memory_size: 64 * 1024,
            image_path: None,
            load_addr: None,
            entry_pc: None,
            xlen: Xlen::X64,
            max_steps: 0,
            tohost: None,
            fromhost: None,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, base: u64, size: usize) -> Self {
        self.memory_base = base;
        self.memory_size = size;
        self
    }

    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// 设置镜像文件与加载地址
    pub fn with_image(mut self, path: impl Into<PathBuf>, load_addr: u64) -> Self {
        self.image_path = Some(path.into());
        self.load_addr = Some(load_addr);
        self
    }

    pub fn with_entry_pc(mut self, pc: u64) -> Self {
        self.entry_pc = Some(pc);
        self
    }

    pub fn with_xlen(mut self, xlen: Xlen) -> Self {
        self.xlen = xlen;
        self
    }

    pub fn with_max_steps(mut self, max: u64) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_tohost(mut self, addr: u64) -> Self {
        self.tohost = Some(addr);
        self
    }

    pub fn with_fromhost(mut self, addr: u64) -> Self {
        self.fromhost = Some(addr);
        self
    }

    fn load_addr(&self) -> u64 {
        self.load_addr.unwrap_or(self.memory_base)
    }

    fn entry_pc(&self) -> u64 {
        self.entry_pc.unwrap_or_else(|| self.load_addr())
    }

    fn step_budget(&self) -> u64 {
        if self.max_steps > 0 { self.max_steps } else { DEFAULT_MAX_STEPS }
    }
}

/// ISA 测试结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    /// 测试通过
    Pass,
    /// 测试失败，包含失败的测试编号
    Fail(u32),
    /// 测试超时或未完成
    Timeout,
}

impl TestResult {
    /// 从 tohost 值解析测试结果
    pub fn from_tohost(value: u32) -> Self {
        if value == 1 {
            TestResult::Pass
        } else if value != 0 {
            // value = (test_num << 1) | 1
            TestResult::Fail(value >> 1)
        } else {
            TestResult::Timeout
        }
    }
}

/// 仿真环境
///
/// 封装了 CPU（及其物理内存）和仿真配置，提供统一的仿真接口
pub struct SimEnv {
    pub cpu: Cpu,
    pub config: SimConfig,
    /// 已执行的指令数
    pub instructions_executed: u64,
}

impl SimEnv {
    /// 从配置创建仿真环境
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        let bus = MemoryMap::with_ram(config.memory_base, config.memory_size);
        let cpu = CpuBuilder::new(config.entry_pc())
            .with_xlen(config.xlen)
            .with_memory(bus)
            .build()?;

        let mut env = SimEnv {
            cpu,
            config,
            instructions_executed: 0,
        };
        env.load_configured_image()?;
        env.clear_htif_mailboxes();
        log::debug!(
            "sim env ready: {} ram=0x{:x}+0x{:x} entry=0x{:x}",
            env.config.xlen,
            env.config.memory_base,
            env.config.memory_size,
            env.cpu.pc()
        );
        Ok(env)
    }

    fn load_configured_image(&mut self) -> Result<(), SimError> {
        let Some(path) = self.config.image_path.clone() else {
            return Ok(());
        };
        let data = std::fs::read(&path).map_err(|source| SimError::Io {
            path: path.clone(),
            source,
        })?;
        let addr = self.config.load_addr();
        self.load_image(addr, &data)?;
        log::debug!("loaded {:?}: {} bytes at 0x{:x}", path, data.len(), addr);
        Ok(())
    }

    /// 把一段镜像写入物理内存
    pub fn load_image(&mut self, addr: u64, data: &[u8]) -> Result<(), SimError> {
        let end = addr.checked_add(data.len() as u64);
        let fits = data.is_empty()
            || end.is_some_and(|end| self.cpu.memory().contains(addr) && self.cpu.memory().contains(end - 1));
        if !fits {
            return Err(SimError::ImageOutOfRange { addr, len: data.len() });
        }
        self.cpu.memory_mut().write_bytes(addr, data)?;
        Ok(())
    }

    /// 运行指定数量的指令，遇到断点或 WFI 时提前返回
    pub fn run(&mut self, max_steps: u64) -> StepOutcome {
        let outcome = self.cpu.step(max_steps);
        self.instructions_executed += outcome.executed;
        outcome
    }

    /// 按配置的指令上限运行
    pub fn run_until_halt(&mut self) -> StepOutcome {
        let budget = self.config.step_budget();
        self.run(budget)
    }

    /// 获取 CPU 引用
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// 获取 CPU 可变引用
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// 打印仿真状态
    pub fn dump(&self) {
        println!("=== SimEnv Status ===");
        println!("Instructions executed: {}", self.instructions_executed);
        self.cpu.dump_regs();
    }

    /// 检查 tohost 值并在检测到写入时执行 ACK
    pub fn check_tohost(&mut self) -> Option<u32> {
        let addr = self.config.tohost?;
        let value = self.cpu.memory().load32(addr).ok()?;
        if value == 0 {
            return None;
        }
        self.acknowledge_tohost(value);
        Some(value)
    }

    fn clear_htif_mailboxes(&mut self) {
        for addr in [self.config.tohost, self.config.fromhost].into_iter().flatten() {
            if let Err(err) = self.cpu.memory_mut().store32(addr, 0) {
                log::warn!("cannot clear HTIF mailbox: {}", err);
            }
        }
    }

    fn acknowledge_tohost(&mut self, value: u32) {
        if let Some(addr) = self.config.tohost {
            let _ = self.cpu.memory_mut().store32(addr, 0);
        }
        if let Some(addr) = self.config.fromhost {
            let _ = self.cpu.memory_mut().store32(addr, value);
        }
    }

    /// 运行 ISA 测试
    ///
    /// 执行程序直到 tohost 被写入，或达到最大指令数
    ///
    /// # 参数
    ///
    /// * `max_steps` - 最大执行指令数（0 表示使用配置值）
    ///
    /// # 返回
    ///
    /// * `TestResult` - 测试结果（Pass/Fail/Timeout）
    /// * `u64` - 执行的指令数
    pub fn run_isa_test(&mut self, max_steps: u64) -> (TestResult, u64) {
        let max = if max_steps > 0 { max_steps } else { self.config.step_budget() };
        let start = self.instructions_executed;

        if self.config.tohost.is_none() {
            self.run(max);
            log::warn!("no tohost address configured, ran {} instructions", max);
            return (TestResult::Timeout, self.instructions_executed - start);
        }

        self.clear_htif_mailboxes();
        let mut remaining = max;
        while remaining > 0 {
            let outcome = self.run(remaining.min(TOHOST_POLL_INTERVAL));
            remaining -= outcome.executed;

            if let Some(value) = self.check_tohost() {
                return (TestResult::from_tohost(value), self.instructions_executed - start);
            }
            if let Some(stop) = outcome.stop {
                log::warn!("stopped by {:?} at pc=0x{:x} before tohost was written", stop, self.cpu.pc());
                break;
            }
        }

        let executed = self.instructions_executed - start;
        if remaining == 0 {
            log::warn!("no test result after {} instructions", executed);
        }
        (TestResult::Timeout, executed)
    }

    /// 重置仿真环境：CPU 硬复位，重新加载镜像
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.cpu.reset(true, self.config.entry_pc());
        self.instructions_executed = 0;
        self.load_configured_image()?;
        self.clear_htif_mailboxes();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_program(env: &mut SimEnv, addr: u64, program: &[u32]) {
        let bytes: Vec<u8> = program.iter().flat_map(|w| w.to_le_bytes()).collect();
        env.load_image(addr, &bytes).expect("program fits");
    }

    /// 把 `value` 写入 0x1000 处的 tohost 后原地循环
    fn tohost_program(value_instr: u32) -> [u32; 4] {
        [
            value_instr, // addi x1, x0, value
            0x00001137,  // lui x2, 0x1
            0x00112023,  // sw x1, 0(x2)
            0x0000006F,  // j .
        ]
    }

    #[test]
    fn test_sim_config_builder() {
        let config = SimConfig::new()
            .with_memory(0x8000_0000, 128 * 1024)
            .with_entry_pc(0x8000_0000)
            .with_xlen(Xlen::X32)
            .with_max_steps(1000);

        assert_eq!(config.memory_size, 128 * 1024);
        assert_eq!(config.memory_base, 0x8000_0000);
        assert_eq!(config.entry_pc(), 0x8000_0000);
        assert_eq!(config.step_budget(), 1000);
        assert_eq!(SimConfig::new().step_budget(), DEFAULT_MAX_STEPS);
    }

    #[test]
    fn test_tohost_decoding() {
        assert_eq!(TestResult::from_tohost(1), TestResult::Pass);
        assert_eq!(TestResult::from_tohost(7), TestResult::Fail(3));
        assert_eq!(TestResult::from_tohost(0), TestResult::Timeout);
    }

    #[test]
    fn test_sim_env_basic() {
        let config = SimConfig::new().with_memory_size(4096).with_entry_pc(0);
        let mut env = SimEnv::from_config(config).expect("Failed to create sim env");

        // addi x1, x0, 42
        write_program(&mut env, 0, &[0x02A00093]);
        let outcome = env.run(1);
        assert_eq!(outcome.executed, 1);
        assert_eq!(env.cpu.read_reg(1), 42);
        assert_eq!(env.instructions_executed, 1);
    }

    #[test]
    fn test_isa_test_pass() {
        let config = SimConfig::new().with_tohost(0x1000);
        let mut env = SimEnv::from_config(config).unwrap();
        write_program(&mut env, 0, &tohost_program(0x00100093));
        let (result, executed) = env.run_isa_test(10_000);
        assert_eq!(result, TestResult::Pass);
        assert!(executed >= 3);
        // ACK 之后 tohost 被清零
        assert_eq!(env.cpu.memory().load32(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_isa_test_fail() {
        let config = SimConfig::new().with_tohost(0x1000).with_xlen(Xlen::X32);
        let mut env = SimEnv::from_config(config).unwrap();
        write_program(&mut env, 0, &tohost_program(0x00700093));
        let (result, _) = env.run_isa_test(10_000);
        assert_eq!(result, TestResult::Fail(3));
    }

    #[test]
    fn test_isa_test_timeout() {
        let config = SimConfig::new().with_tohost(0x1000);
        let mut env = SimEnv::from_config(config).unwrap();
        write_program(&mut env, 0, &[0x0000006F]);
        let (result, executed) = env.run_isa_test(2500);
        assert_eq!(result, TestResult::Timeout);
        assert_eq!(executed, 2500);
    }

    #[test]
    fn test_image_loading() {
        let path = std::env::temp_dir().join(format!("r5emu-image-{}.bin", std::process::id()));
        std::fs::write(&path, 0x02A00093u32.to_le_bytes()).unwrap();

        let config = SimConfig::new().with_image(&path, 0x100);
        let mut env = SimEnv::from_config(config).unwrap();
        assert_eq!(env.cpu.pc(), 0x100);
        env.run(1);
        assert_eq!(env.cpu.read_reg(1), 42);

        env.reset().unwrap();
        assert_eq!(env.cpu.read_reg(1), 0);
        assert_eq!(env.cpu.pc(), 0x100);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_image_errors() {
        let config = SimConfig::new().with_image("/nonexistent/r5emu.bin", 0);
        assert!(matches!(SimEnv::from_config(config), Err(SimError::Io { .. })));

        let mut env = SimEnv::from_config(SimConfig::new().with_memory_size(16)).unwrap();
        assert!(matches!(
            env.load_image(8, &[0; 16]),
            Err(SimError::ImageOutOfRange { addr: 8, len: 16 })
        ));
    }
}
