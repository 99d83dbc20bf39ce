//! 地址翻译
//!
//! CPU 的取指与访存都先经过 `TranslationCache` 把虚拟地址翻译为物理地址。
//! 翻译以页为单位；跨页的取指对两页分别翻译。

use std::collections::HashMap;

use thiserror::Error;

use crate::memory::MemoryMap;

pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;
/// 页内偏移掩码
pub const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// 访问类型，决定翻译失败时的异常种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Fetch,
    Load,
    Store,
}

/// 翻译失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// 虚拟页没有映射
    #[error("page fault on {access:?} at 0x{addr:016x}")]
    PageFault { addr: u64, access: Access },

    /// 物理地址没有内存
    #[error("access fault on {access:?} at 0x{addr:016x}")]
    AccessFault { addr: u64, access: Access },
}

impl TranslateError {
    pub fn addr(&self) -> u64 {
        match *self {
            TranslateError::PageFault { addr, .. } | TranslateError::AccessFault { addr, .. } => addr,
        }
    }
}

/// 虚拟地址到物理地址的翻译缓存
pub trait TranslationCache {
    /// 翻译一个地址；页内偏移保持不变
    fn translate(&mut self, bus: &MemoryMap, addr: u64, access: Access) -> Result<u64, TranslateError>;

    /// 丢弃全部缓存的翻译
    fn invalidate(&mut self);
}

const TLB_ENTRIES: usize = 256;

/// 直接映射：虚拟地址即物理地址
///
/// 缓存已确认有内存的页，命中时 O(1)。
pub struct IdentityTlb {
    tags: Box<[Option<u64>; TLB_ENTRIES]>,
}

impl IdentityTlb {
    pub fn new() -> Self {
        IdentityTlb {
            tags: Box::new([None; TLB_ENTRIES]),
        }
    }
}

impl Default for IdentityTlb {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationCache for IdentityTlb {
    fn translate(&mut self, bus: &MemoryMap, addr: u64, access: Access) -> Result<u64, TranslateError> {
        let page = addr >> PAGE_SHIFT;
        let slot = (page as usize) % TLB_ENTRIES;
        if self.tags[slot] == Some(page) {
            return Ok(addr);
        }
        if !bus.contains(addr) {
            return Err(TranslateError::AccessFault { addr, access });
        }
        self.tags[slot] = Some(page);
        Ok(addr)
    }

    fn invalidate(&mut self) {
        self.tags.fill(None);
    }
}

/// 显式页表：虚拟页号到物理页号
///
/// 未映射的页产生缺页；页可以映射到任意、互不连续的物理页。
#[derive(Debug, Default, Clone)]
pub struct PageMapTlb {
    pages: HashMap<u64, u64>,
}

impl PageMapTlb {
    pub fn new() -> Self {
        Self::default()
    }

    /// 映射一页，地址按页对齐截断
    pub fn map(&mut self, virt: u64, phys: u64) {
        self.pages.insert(virt >> PAGE_SHIFT, phys >> PAGE_SHIFT);
    }

    pub fn unmap(&mut self, virt: u64) {
        self.pages.remove(&(virt >> PAGE_SHIFT));
    }
}

impl TranslationCache for PageMapTlb {
    fn translate(&mut self, bus: &MemoryMap, addr: u64, access: Access) -> Result<u64, TranslateError> {
        let ppn = self
            .pages
            .get(&(addr >> PAGE_SHIFT))
            .ok_or(TranslateError::PageFault { addr, access })?;
        let phys = (ppn << PAGE_SHIFT) | (addr & PAGE_MASK);
        if !bus.contains(phys) {
            return Err(TranslateError::AccessFault { addr, access });
        }
        Ok(phys)
    }

    // 映射由使用者显式维护，没有需要丢弃的派生状态
    fn invalidate(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_translation() {
        let bus = MemoryMap::with_ram(0x8000_0000, 0x2000);
        let mut tlb = IdentityTlb::new();
        assert_eq!(tlb.translate(&bus, 0x8000_0123, Access::Load), Ok(0x8000_0123));
        // 命中缓存
        assert_eq!(tlb.translate(&bus, 0x8000_0FFE, Access::Fetch), Ok(0x8000_0FFE));
        assert_eq!(
            tlb.translate(&bus, 0x1000, Access::Store),
            Err(TranslateError::AccessFault { addr: 0x1000, access: Access::Store })
        );
        tlb.invalidate();
        assert_eq!(tlb.translate(&bus, 0x8000_1000, Access::Load), Ok(0x8000_1000));
    }

    #[test]
    fn test_page_map_translation() {
        let bus = MemoryMap::with_ram(0, 0x10000);
        let mut tlb = PageMapTlb::new();
        tlb.map(0x0000, 0x5000);
        tlb.map(0x1000, 0x2000);
        assert_eq!(tlb.translate(&bus, 0x0FFE, Access::Fetch), Ok(0x5FFE));
        assert_eq!(tlb.translate(&bus, 0x1000, Access::Fetch), Ok(0x2000));
        assert!(matches!(
            tlb.translate(&bus, 0x2000, Access::Load),
            Err(TranslateError::PageFault { addr: 0x2000, .. })
        ));
        tlb.map(0x3000, 0x20000);
        assert!(matches!(
            tlb.translate(&bus, 0x3000, Access::Load),
            Err(TranslateError::AccessFault { .. })
        ));
    }
}
