//! 调试接口：PC 断点

use std::collections::BTreeSet;

/// 断点集合
///
/// `step` 在执行 PC 命中断点的指令之前停下。再次 `step` 时该断点被跳过一次，
/// 保证从断点处可以继续执行。
#[derive(Debug, Default, Clone)]
pub struct DebugInterface {
    breakpoints: BTreeSet<u64>,
    /// 上次停下的断点地址，下一次检查时放行
    resume_from: Option<u64>,
}

impl DebugInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加断点，已存在时返回 false
    pub fn add_breakpoint(&mut self, pc: u64) -> bool {
        self.breakpoints.insert(pc)
    }

    /// 删除断点，不存在时返回 false
    pub fn remove_breakpoint(&mut self, pc: u64) -> bool {
        self.breakpoints.remove(&pc)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
        self.resume_from = None;
    }

    pub fn has_breakpoint(&self, pc: u64) -> bool {
        self.breakpoints.contains(&pc)
    }

    /// 按地址升序
    pub fn breakpoints(&self) -> impl Iterator<Item = u64> + '_ {
        self.breakpoints.iter().copied()
    }

    /// 在执行 `pc` 处的指令之前调用
    pub(crate) fn should_break(&mut self, pc: u64) -> bool {
        if self.resume_from.take() == Some(pc) {
            return false;
        }
        if self.breakpoints.contains(&pc) {
            self.resume_from = Some(pc);
            return true;
        }
        false
    }
}
