//! r5emu: RISC-V 单 hart 指令集仿真库
//!
//! 解码器由声明表在启动时构建为决策树（RV32、RV64 各一棵），
//! 分派循环按当前寄存器宽度选择解码树，执行绑定的 handler，并负责
//! PC 推进、跨页取指与同步异常。
//!
//! # 模块结构
//!
//! - `isa`: 指令声明、解码树构建与操作数提取
//! - `cpu`: CPU 核心、分派循环、CSR 与 trap、执行单元
//! - `memory`: 物理内存抽象层
//! - `mmu`: 地址翻译缓存
//! - `sim_env`: 仿真环境（配置、镜像加载、ISA 测试）

pub mod cpu;
pub mod isa;
pub mod memory;
pub mod mmu;
pub mod sim_env;
