//! CSR 地址与注册表
//!
//! 每个 CSR 先定义地址常量 `CSR_XXX`，再在对应特权级的表中登记复位值。
//! 表中的 CSR 由 `CsrBank` 保存；sstatus、misa 和计数器是派生视图，
//! 在 CPU 的 CSR 访问路径上单独处理。

use super::status::CsrEntry;

// ============================================================================
// Unprivileged Counters (只读视图)
// ============================================================================

pub const CSR_CYCLE: u16 = 0xC00;
pub const CSR_TIME: u16 = 0xC01;
pub const CSR_INSTRET: u16 = 0xC02;

// ============================================================================
// Machine-level CSR Addresses (M-mode)
// ============================================================================

// Machine Information
pub const CSR_MVENDORID: u16 = 0xF11;
pub const CSR_MARCHID: u16 = 0xF12;
pub const CSR_MIMPID: u16 = 0xF13;
pub const CSR_MHARTID: u16 = 0xF14;

// Machine Trap Setup
pub const CSR_MSTATUS: u16 = 0x300;
pub const CSR_MISA: u16 = 0x301;
pub const CSR_MEDELEG: u16 = 0x302;
pub const CSR_MIDELEG: u16 = 0x303;
pub const CSR_MIE: u16 = 0x304;
pub const CSR_MTVEC: u16 = 0x305;
pub const CSR_MCOUNTEREN: u16 = 0x306;

// Machine Trap Handling
pub const CSR_MSCRATCH: u16 = 0x340;
pub const CSR_MEPC: u16 = 0x341;
pub const CSR_MCAUSE: u16 = 0x342;
pub const CSR_MTVAL: u16 = 0x343;
pub const CSR_MIP: u16 = 0x344;

// Machine Counters
pub const CSR_MCYCLE: u16 = 0xB00;
pub const CSR_MINSTRET: u16 = 0xB02;

/// Machine-level CSRs.
pub const M_CSRS: &[CsrEntry] = &[
    CsrEntry { name: "mvendorid",  addr: CSR_MVENDORID,  reset: 0 },
    CsrEntry { name: "marchid",    addr: CSR_MARCHID,    reset: 0 },
    CsrEntry { name: "mimpid",     addr: CSR_MIMPID,     reset: 0 },
    CsrEntry { name: "mhartid",    addr: CSR_MHARTID,    reset: 0 },
    CsrEntry { name: "mstatus",    addr: CSR_MSTATUS,    reset: 0 },
    CsrEntry { name: "medeleg",    addr: CSR_MEDELEG,    reset: 0 },
    CsrEntry { name: "mideleg",    addr: CSR_MIDELEG,    reset: 0 },
    CsrEntry { name: "mie",        addr: CSR_MIE,        reset: 0 },
    CsrEntry { name: "mtvec",      addr: CSR_MTVEC,      reset: 0 },
    CsrEntry { name: "mcounteren", addr: CSR_MCOUNTEREN, reset: 0 },
    CsrEntry { name: "mscratch",   addr: CSR_MSCRATCH,   reset: 0 },
    CsrEntry { name: "mepc",       addr: CSR_MEPC,       reset: 0 },
    CsrEntry { name: "mcause",     addr: CSR_MCAUSE,     reset: 0 },
    CsrEntry { name: "mtval",      addr: CSR_MTVAL,      reset: 0 },
    CsrEntry { name: "mip",        addr: CSR_MIP,        reset: 0 },
];

// ============================================================================
// Supervisor-level CSR Addresses (S-mode)
// ============================================================================

// Supervisor Trap Setup
pub const CSR_SSTATUS: u16 = 0x100;
pub const CSR_SIE: u16 = 0x104;
pub const CSR_STVEC: u16 = 0x105;
pub const CSR_SCOUNTEREN: u16 = 0x106;

// Supervisor Trap Handling
pub const CSR_SSCRATCH: u16 = 0x140;
pub const CSR_SEPC: u16 = 0x141;
pub const CSR_SCAUSE: u16 = 0x142;
pub const CSR_STVAL: u16 = 0x143;
pub const CSR_SIP: u16 = 0x144;

// Supervisor Address Translation
pub const CSR_SATP: u16 = 0x180;

/// Supervisor-level CSRs.
pub const S_CSRS: &[CsrEntry] = &[
    CsrEntry { name: "sie",        addr: CSR_SIE,        reset: 0 },
    CsrEntry { name: "stvec",      addr: CSR_STVEC,      reset: 0 },
    CsrEntry { name: "scounteren", addr: CSR_SCOUNTEREN, reset: 0 },
    CsrEntry { name: "sscratch",   addr: CSR_SSCRATCH,   reset: 0 },
    CsrEntry { name: "sepc",       addr: CSR_SEPC,       reset: 0 },
    CsrEntry { name: "scause",     addr: CSR_SCAUSE,     reset: 0 },
    CsrEntry { name: "stval",      addr: CSR_STVAL,      reset: 0 },
    CsrEntry { name: "sip",        addr: CSR_SIP,        reset: 0 },
    CsrEntry { name: "satp",       addr: CSR_SATP,       reset: 0 },
];

/// CSR 名称，用于寄存器转储
pub fn csr_name(addr: u16) -> Option<&'static str> {
    M_CSRS
        .iter()
        .chain(S_CSRS)
        .find(|e| e.addr == addr)
        .map(|e| e.name)
}

/// 地址编码的最低访问特权级（bits 9:8）
#[inline]
pub fn required_privilege(addr: u16) -> u64 {
    u64::from((addr >> 8) & 0x3)
}

/// 地址编码的只读 CSR（bits 11:10 = 0b11）
#[inline]
pub fn is_read_only(addr: u16) -> bool {
    (addr >> 10) & 0x3 == 0x3
}
