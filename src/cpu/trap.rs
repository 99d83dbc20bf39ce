//! Trap（同步异常）处理相关类型
//!
//! # 特权级
//!
//! - **Machine (M)**: 最高特权级，复位后所处模式
//! - **Supervisor (S)**: 可通过 medeleg 接收委托的异常
//! - **User (U)**: 用户模式

use std::fmt;

use crate::memory::MemError;
use crate::mmu::{Access, TranslateError};

/// 特权级模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum PrivilegeMode {
    User = 0,
    Supervisor = 1,
    /// 最高特权级，复位默认值
    #[default]
    Machine = 3,
}

impl PrivilegeMode {
    /// 从 2-bit 编码创建特权级，保留编码按 Machine 处理
    pub fn from_bits(bits: u64) -> Self {
        match bits & 0x3 {
            0 => PrivilegeMode::User,
            1 => PrivilegeMode::Supervisor,
            _ => PrivilegeMode::Machine,
        }
    }

    pub fn to_bits(self) -> u64 {
        self as u64
    }
}

/// 同步异常原因，编码即 mcause/scause 的值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    /// code = 0
    InstructionAddressMisaligned,
    /// code = 1
    InstructionAccessFault,
    /// code = 2
    IllegalInstruction,
    /// code = 3
    Breakpoint,
    /// code = 4
    LoadAddressMisaligned,
    /// code = 5
    LoadAccessFault,
    /// code = 6
    StoreAddressMisaligned,
    /// code = 7
    StoreAccessFault,
    /// code = 8
    EcallFromU,
    /// code = 9
    EcallFromS,
    /// code = 11
    EcallFromM,
    /// code = 12
    InstructionPageFault,
    /// code = 13
    LoadPageFault,
    /// code = 15
    StorePageFault,
}

impl TrapCause {
    /// mcause 的异常码
    pub fn code(&self) -> u64 {
        match self {
            TrapCause::InstructionAddressMisaligned => 0,
            TrapCause::InstructionAccessFault => 1,
            TrapCause::IllegalInstruction => 2,
            TrapCause::Breakpoint => 3,
            TrapCause::LoadAddressMisaligned => 4,
            TrapCause::LoadAccessFault => 5,
            TrapCause::StoreAddressMisaligned => 6,
            TrapCause::StoreAccessFault => 7,
            TrapCause::EcallFromU => 8,
            TrapCause::EcallFromS => 9,
            TrapCause::EcallFromM => 11,
            TrapCause::InstructionPageFault => 12,
            TrapCause::LoadPageFault => 13,
            TrapCause::StorePageFault => 15,
        }
    }

    /// 根据当前特权级获取对应的 ECALL 异常
    pub fn ecall_from(mode: PrivilegeMode) -> Self {
        match mode {
            PrivilegeMode::User => TrapCause::EcallFromU,
            PrivilegeMode::Supervisor => TrapCause::EcallFromS,
            PrivilegeMode::Machine => TrapCause::EcallFromM,
        }
    }

    /// 翻译失败对应的异常
    pub fn from_translate(err: &TranslateError) -> Self {
        match *err {
            TranslateError::PageFault { access, .. } => match access {
                Access::Fetch => TrapCause::InstructionPageFault,
                Access::Load => TrapCause::LoadPageFault,
                Access::Store => TrapCause::StorePageFault,
            },
            TranslateError::AccessFault { access, .. } => Self::access_fault(access),
        }
    }

    /// 物理访存失败对应的异常
    pub fn from_mem(err: &MemError, access: Access) -> Self {
        match (err, access) {
            (MemError::Unaligned { .. }, Access::Fetch) => TrapCause::InstructionAddressMisaligned,
            (MemError::Unaligned { .. }, Access::Load) => TrapCause::LoadAddressMisaligned,
            (MemError::Unaligned { .. }, Access::Store) => TrapCause::StoreAddressMisaligned,
            _ => Self::access_fault(access),
        }
    }

    fn access_fault(access: Access) -> Self {
        match access {
            Access::Fetch => TrapCause::InstructionAccessFault,
            Access::Load => TrapCause::LoadAccessFault,
            Access::Store => TrapCause::StoreAccessFault,
        }
    }
}

/// handler 报告的异常：原因加上 tval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exception {
    pub cause: TrapCause,
    pub tval: u64,
}

impl Exception {
    pub fn new(cause: TrapCause, tval: u64) -> Self {
        Exception { cause, tval }
    }

    /// 非法指令；tval 由分派循环填为指令字
    pub fn illegal() -> Self {
        Exception::new(TrapCause::IllegalInstruction, 0)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (tval=0x{:x})", self.cause, self.tval)
    }
}

impl std::error::Error for Exception {}

// ========== mstatus 字段位置常量 ==========

/// mstatus 寄存器字段
pub mod mstatus {
    pub const SIE: u32 = 1; // Supervisor Interrupt Enable
    pub const MIE: u32 = 3; // Machine Interrupt Enable
    pub const SPIE: u32 = 5; // Supervisor Previous Interrupt Enable
    pub const MPIE: u32 = 7; // Machine Previous Interrupt Enable
    pub const SPP: u32 = 8; // Supervisor Previous Privilege (1 bit)
    pub const MPP: u32 = 11; // Machine Previous Privilege (2 bits)
    pub const MPRV: u32 = 17; // Modify PRiVilege
    pub const SUM: u32 = 18; // Supervisor User Memory access
    pub const MXR: u32 = 19; // Make eXecutable Readable
    pub const TVM: u32 = 20; // Trap Virtual Memory
    pub const TW: u32 = 21; // Timeout Wait
    pub const TSR: u32 = 22; // Trap SRET
    pub const UXL: u32 = 32; // User XLEN (2 bits, RV64)
    pub const SXL: u32 = 34; // Supervisor XLEN (2 bits, RV64)

    pub const SIE_MASK: u64 = 1 << SIE;
    pub const MIE_MASK: u64 = 1 << MIE;
    pub const SPIE_MASK: u64 = 1 << SPIE;
    pub const MPIE_MASK: u64 = 1 << MPIE;
    pub const SPP_MASK: u64 = 1 << SPP;
    pub const MPP_MASK: u64 = 0x3 << MPP;
    pub const MPRV_MASK: u64 = 1 << MPRV;
    pub const TW_MASK: u64 = 1 << TW;
    pub const TSR_MASK: u64 = 1 << TSR;

    /// sstatus 可见的位
    pub const SSTATUS_MASK: u64 =
        SIE_MASK | SPIE_MASK | SPP_MASK | (1 << SUM) | (1 << MXR) | (0x3 << UXL);

    /// 软件可写的位
    pub const WRITABLE_MASK: u64 = SIE_MASK
        | MIE_MASK
        | SPIE_MASK
        | MPIE_MASK
        | SPP_MASK
        | MPP_MASK
        | MPRV_MASK
        | (1 << SUM)
        | (1 << MXR)
        | (1 << TVM)
        | TW_MASK
        | TSR_MASK;

    #[inline]
    pub fn read_mpp(mstatus: u64) -> u64 {
        (mstatus >> MPP) & 0x3
    }

    #[inline]
    pub fn write_mpp(mstatus: u64, mpp: u64) -> u64 {
        (mstatus & !MPP_MASK) | ((mpp & 0x3) << MPP)
    }

    #[inline]
    pub fn read_spp(mstatus: u64) -> u64 {
        (mstatus >> SPP) & 0x1
    }

    #[inline]
    pub fn write_spp(mstatus: u64, spp: u64) -> u64 {
        (mstatus & !SPP_MASK) | ((spp & 0x1) << SPP)
    }

    /// 把 `from` 位的值复制到 `to` 位
    #[inline]
    pub fn copy_bit(mstatus: u64, from: u64, to: u64) -> u64 {
        if mstatus & from != 0 { mstatus | to } else { mstatus & !to }
    }
}

// ========== tvec ==========

/// tvec 模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvecMode {
    /// 所有 trap 跳转到 BASE
    Direct,
    /// 异常跳转到 BASE，中断跳转到 BASE + 4*cause
    Vectored,
}

/// 解析 mtvec/stvec，返回 (base, mode)
#[inline]
pub fn parse_tvec(tvec: u64) -> (u64, TvecMode) {
    let mode = if tvec & 0x3 == 1 {
        TvecMode::Vectored
    } else {
        TvecMode::Direct
    };
    (tvec & !0x3, mode)
}

/// 同步异常的 handler 地址；两种模式下都是 BASE
#[inline]
pub fn calculate_trap_pc(tvec: u64) -> u64 {
    parse_tvec(tvec).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_cause_encoding() {
        assert_eq!(TrapCause::IllegalInstruction.code(), 2);
        assert_eq!(TrapCause::Breakpoint.code(), 3);
        assert_eq!(TrapCause::EcallFromM.code(), 11);
        assert_eq!(TrapCause::StorePageFault.code(), 15);
    }

    #[test]
    fn test_privilege_mode() {
        assert_eq!(PrivilegeMode::from_bits(0), PrivilegeMode::User);
        assert_eq!(PrivilegeMode::from_bits(1), PrivilegeMode::Supervisor);
        assert_eq!(PrivilegeMode::from_bits(3), PrivilegeMode::Machine);
        assert!(PrivilegeMode::User < PrivilegeMode::Supervisor);
        assert!(PrivilegeMode::Supervisor < PrivilegeMode::Machine);
    }

    #[test]
    fn test_fault_mapping() {
        let err = TranslateError::PageFault { addr: 0x1000, access: Access::Fetch };
        assert_eq!(TrapCause::from_translate(&err), TrapCause::InstructionPageFault);
        let err = TranslateError::AccessFault { addr: 0x1000, access: Access::Store };
        assert_eq!(TrapCause::from_translate(&err), TrapCause::StoreAccessFault);

        let err = MemError::Unaligned { addr: 1, access: crate::memory::AccessSize::Word };
        assert_eq!(TrapCause::from_mem(&err, Access::Load), TrapCause::LoadAddressMisaligned);
    }

    #[test]
    fn test_mstatus_fields() {
        let value = 0x0000_1888; // MPP=3, MPIE=1, MIE=1
        assert_eq!(mstatus::read_mpp(value), 3);
        assert_eq!(mstatus::read_mpp(mstatus::write_mpp(value, 1)), 1);
        let copied = mstatus::copy_bit(value, mstatus::MIE_MASK, mstatus::SPIE_MASK);
        assert_ne!(copied & mstatus::SPIE_MASK, 0);
    }

    #[test]
    fn test_tvec_parsing() {
        assert_eq!(parse_tvec(0x8000_0000), (0x8000_0000, TvecMode::Direct));
        assert_eq!(parse_tvec(0x8000_0001), (0x8000_0000, TvecMode::Vectored));
        assert_eq!(calculate_trap_pc(0x8000_0001), 0x8000_0000);
    }
}
