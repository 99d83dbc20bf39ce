//! CPU architectural state components: register file and CSR bank.

use std::collections::HashMap;

use super::trap::PrivilegeMode;

/// Generic register file with configurable count, element type, and zero-hardwire behavior.
///
/// - `N`: number of registers
/// - `T`: element type
/// - `ZERO_HARDWIRE`: if true, register 0 always reads as zero and writes are ignored
#[derive(Clone)]
pub struct GenericRegFile<const N: usize, T: Copy + Default, const ZERO_HARDWIRE: bool> {
    regs: [T; N],
}

impl<const N: usize, T: Copy + Default, const ZERO_HARDWIRE: bool> GenericRegFile<N, T, ZERO_HARDWIRE> {
    pub fn new() -> Self {
        Self { regs: [T::default(); N] }
    }

    #[inline]
    pub fn read(&self, reg: usize) -> T {
        if ZERO_HARDWIRE && reg == 0 {
            T::default()
        } else {
            self.regs[reg % N]
        }
    }

    #[inline]
    pub fn write(&mut self, reg: usize, value: T) {
        if ZERO_HARDWIRE && reg == 0 {
            return;
        }
        self.regs[reg % N] = value;
    }

    pub fn snapshot(&self) -> &[T; N] {
        &self.regs
    }
}

impl<const N: usize, T: Copy + Default, const ZERO_HARDWIRE: bool> Default for GenericRegFile<N, T, ZERO_HARDWIRE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer register file x0..x31. x0 is hard-wired to zero.
pub type RegFile = GenericRegFile<32, u64, true>;

/// Table entry for CSR declaration: name, address, reset value.
#[derive(Debug, Clone, Copy)]
pub struct CsrEntry {
    pub name: &'static str,
    pub addr: u16,
    pub reset: u64,
}

/// CSR bank: a hash table indexed by address. Only registered CSRs exist.
#[derive(Clone, Default)]
pub struct CsrBank {
    table: HashMap<u16, u64>,
}

impl CsrBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a batch of CSRs declared as a table.
    pub fn register(&mut self, entries: &[CsrEntry]) {
        for e in entries {
            self.table.insert(e.addr, e.reset);
        }
    }

    #[inline]
    pub fn contains(&self, addr: u16) -> bool {
        self.table.contains_key(&addr)
    }

    /// Unregistered CSRs read as zero.
    #[inline]
    pub fn read(&self, addr: u16) -> u64 {
        self.table.get(&addr).copied().unwrap_or(0)
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u64) {
        self.table.insert(addr, value);
    }

    pub fn snapshot(&self) -> &HashMap<u16, u64> {
        &self.table
    }
}

/// Aggregated architectural state: integer RF, CSR bank and privilege mode.
#[derive(Clone)]
pub struct Status {
    pub int: RegFile,
    pub csr: CsrBank,
    pub privilege: PrivilegeMode,
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    /// 复位状态：寄存器清零，CSR 取复位值，M-mode
    pub fn new() -> Self {
        let mut csr = CsrBank::new();
        csr.register(super::csr_def::M_CSRS);
        csr.register(super::csr_def::S_CSRS);
        Self {
            int: RegFile::new(),
            csr,
            privilege: PrivilegeMode::Machine,
        }
    }

    #[inline]
    pub fn int_read(&self, reg: usize) -> u64 {
        self.int.read(reg)
    }

    #[inline]
    pub fn int_write(&mut self, reg: usize, value: u64) {
        self.int.write(reg, value)
    }

    #[inline]
    pub fn int_snapshot(&self) -> &[u64; 32] {
        self.int.snapshot()
    }

    #[inline]
    pub fn csr_read(&self, addr: u16) -> u64 {
        self.csr.read(addr)
    }

    #[inline]
    pub fn csr_write(&mut self, addr: u16, value: u64) {
        self.csr.write(addr, value)
    }

    /// Snapshot all architectural state at once.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            int: *self.int.snapshot(),
            csr: self.csr.table.clone(),
            privilege: self.privilege,
        }
    }
}

/// Snapshot of all architectural state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub int: [u64; 32],
    pub csr: HashMap<u16, u64>,
    pub privilege: PrivilegeMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::csr_def::{CSR_MSTATUS, CSR_SATP};

    #[test]
    fn test_x0_hardwired() {
        let mut rf = RegFile::new();
        rf.write(0, 42);
        rf.write(5, 7);
        assert_eq!(rf.read(0), 0);
        assert_eq!(rf.read(5), 7);
    }

    #[test]
    fn test_reset_registers_csrs() {
        let status = Status::new();
        assert!(status.csr.contains(CSR_MSTATUS));
        assert!(status.csr.contains(CSR_SATP));
        assert!(!status.csr.contains(0x7C0));
        assert_eq!(status.privilege, PrivilegeMode::Machine);
    }
}
