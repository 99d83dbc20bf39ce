//! r5emu_cli 命令行入口
//!
//! 给定镜像时加载并运行；配置了 tohost 时按 ISA 测试判定结果。
//! 未给定镜像时运行内置的演示程序。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use r5emu::cpu::StopReason;
use r5emu::isa::Xlen;
use r5emu::sim_env::{SimConfig, SimEnv, SimError, TestResult};

/// RISC-V 单 hart 指令集仿真器
#[derive(Parser, Debug)]
#[command(name = "r5emu_cli", version, about)]
struct Args {
    /// 原始二进制镜像；省略时运行内置演示程序
    image: Option<PathBuf>,

    /// 寄存器宽度：32 或 64
    #[arg(long, default_value_t = 64, value_parser = parse_xlen_bits)]
    xlen: u32,

    /// RAM 起始地址
    #[arg(long, default_value = "0x80000000", value_parser = parse_u64)]
    mem_base: u64,

    /// RAM 大小（字节）
    #[arg(long, default_value = "0x100000", value_parser = parse_u64)]
    mem_size: u64,

    /// 镜像加载地址，默认为 RAM 起始地址
    #[arg(long, value_parser = parse_u64)]
    load_addr: Option<u64>,

    /// 入口 PC，默认为镜像加载地址
    #[arg(long, value_parser = parse_u64)]
    entry: Option<u64>,

    /// 最大执行指令数
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,

    /// tohost 地址，设置后按 ISA 测试判定结果
    #[arg(long, value_parser = parse_u64)]
    tohost: Option<u64>,

    /// 结束后打印寄存器
    #[arg(long)]
    dump: bool,
}

/// 解析十进制或 0x 前缀的十六进制数
fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_xlen_bits(s: &str) -> Result<u32, String> {
    match s {
        "32" => Ok(32),
        "64" => Ok(64),
        _ => Err(format!("xlen must be 32 or 64, got {s:?}")),
    }
}

impl Args {
    fn xlen(&self) -> Xlen {
        if self.xlen == 32 { Xlen::X32 } else { Xlen::X64 }
    }

    fn to_config(&self) -> SimConfig {
        let mut config = SimConfig::new()
            .with_memory(self.mem_base, self.mem_size as usize)
            .with_xlen(self.xlen())
            .with_max_steps(self.max_steps);
        if let Some(image) = &self.image {
            config = config.with_image(image, self.load_addr.unwrap_or(self.mem_base));
        }
        if let Some(entry) = self.entry {
            config = config.with_entry_pc(entry);
        }
        if let Some(tohost) = self.tohost {
            config = config.with_tohost(tohost);
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = if args.image.is_some() { run_image(&args) } else { run_demo(&args) };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_image(args: &Args) -> Result<ExitCode, SimError> {
    let mut env = SimEnv::from_config(args.to_config())?;

    let code = if args.tohost.is_some() {
        let (result, executed) = env.run_isa_test(args.max_steps);
        println!("{:?} after {} instructions", result, executed);
        if result == TestResult::Pass { ExitCode::SUCCESS } else { ExitCode::FAILURE }
    } else {
        let outcome = env.run_until_halt();
        println!(
            "executed {} instructions, stop: {:?}, pc=0x{:x}",
            outcome.executed,
            outcome.stop,
            env.cpu.pc()
        );
        ExitCode::SUCCESS
    };

    if args.dump {
        env.dump();
    }
    Ok(code)
}

/// 演示程序：计算 1 + 2 + ... + 10 = 55，然后 WFI 停下
fn run_demo(args: &Args) -> Result<ExitCode, SimError> {
    println!("=== r5emu: RISC-V {} 演示 ===\n", args.xlen());

    let program: &[u32] = &[
        0x00000093, // addi x1, x0, 0      # x1 = sum = 0
        0x00100113, // addi x2, x0, 1      # x2 = i = 1
        0x00B00193, // addi x3, x0, 11     # x3 = limit = 11
        // loop (地址 12):
        0x002080B3, // add x1, x1, x2      # sum += i
        0x00110113, // addi x2, x2, 1      # i++
        0xFE314CE3, // blt x2, x3, -8      # if i < limit goto loop
        0x10500073, // wfi                 # 结束
    ];
    let bytes: Vec<u8> = program.iter().flat_map(|w| w.to_le_bytes()).collect();

    let mut env = SimEnv::from_config(args.to_config())?;
    let base = env.config.memory_base;
    env.load_image(base, &bytes)?;

    let outcome = env.run_until_halt();
    println!("执行指令数: {}", outcome.executed);
    println!(
        "最终状态: {}",
        match outcome.stop {
            Some(StopReason::WaitForInterrupt) => "等待中断 (WFI)",
            Some(StopReason::Breakpoint(_)) => "断点",
            None => "达到指令上限",
        }
    );
    println!();
    env.dump();

    let sum = env.cpu.read_reg(1);
    println!("计算结果: x1 = {} (预期 55)", sum);
    Ok(if sum == 55 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
