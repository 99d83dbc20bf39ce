//! 物理内存抽象层
//!
//! 本模块定义了物理内存访问的统一接口 `Memory` trait，
//! 线性内存实现 `FlatMemory`，以及把多个区域拼成物理地址空间的 `MemoryMap`。

use thiserror::Error;

/// 访存粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSize {
    Byte,
    Half,
    Word,
    Double,
}

impl AccessSize {
    pub fn bytes(self) -> usize {
        match self {
            AccessSize::Byte => 1,
            AccessSize::Half => 2,
            AccessSize::Word => 4,
            AccessSize::Double => 8,
        }
    }

    /// 访问宽度的位数
    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// 内存访问错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemError {
    /// 地址未按访问粒度对齐
    #[error("unaligned {access:?} access at 0x{addr:016x}")]
    Unaligned { addr: u64, access: AccessSize },

    /// 地址未映射到任何内存区域
    #[error("out-of-range {access:?} access at 0x{addr:016x}")]
    OutOfRange { addr: u64, access: AccessSize },

    /// 新区域与已有区域重叠
    #[error("region 0x{base:016x}+0x{size:x} overlaps an existing region")]
    Overlap { base: u64, size: u64 },
}

pub type MemResult<T> = Result<T, MemError>;

/// 物理内存访问接口（小端序）
pub trait Memory {
    fn load8(&self, addr: u64) -> MemResult<u8>;
    fn load16(&self, addr: u64) -> MemResult<u16>;
    fn load32(&self, addr: u64) -> MemResult<u32>;
    fn load64(&self, addr: u64) -> MemResult<u64>;

    fn store8(&mut self, addr: u64, value: u8) -> MemResult<()>;
    fn store16(&mut self, addr: u64, value: u16) -> MemResult<()>;
    fn store32(&mut self, addr: u64, value: u32) -> MemResult<()>;
    fn store64(&mut self, addr: u64, value: u64) -> MemResult<()>;

    /// 按粒度读取，结果零扩展
    fn load(&self, addr: u64, size: AccessSize) -> MemResult<u64> {
        match size {
            AccessSize::Byte => self.load8(addr).map(u64::from),
            AccessSize::Half => self.load16(addr).map(u64::from),
            AccessSize::Word => self.load32(addr).map(u64::from),
            AccessSize::Double => self.load64(addr),
        }
    }

    /// 按粒度写入，截断高位
    fn store(&mut self, addr: u64, value: u64, size: AccessSize) -> MemResult<()> {
        match size {
            AccessSize::Byte => self.store8(addr, value as u8),
            AccessSize::Half => self.store16(addr, value as u16),
            AccessSize::Word => self.store32(addr, value as u32),
            AccessSize::Double => self.store64(addr, value),
        }
    }
}

/// 简单线性内存
///
/// 使用 `Vec<u8>` 存储一段物理地址空间，按基地址偏移访问。
pub struct FlatMemory {
    data: Vec<u8>,
    base_addr: u64,
}

impl FlatMemory {
    /// 创建一个指定大小的内存区域
    ///
    /// ```
    /// use r5emu::memory::FlatMemory;
    ///
    /// // 64KB，起始地址 0x8000_0000
    /// let mem = FlatMemory::new(64 * 1024, 0x8000_0000);
    /// assert_eq!(mem.size(), 64 * 1024);
    /// ```
    pub fn new(size: usize, base_addr: u64) -> Self {
        FlatMemory {
            data: vec![0; size],
            base_addr,
        }
    }

    pub fn base_addr(&self) -> u64 {
        self.base_addr
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 地址是否落在本区域内
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base_addr && addr - self.base_addr < self.data.len() as u64
    }

    fn ensure_aligned(addr: u64, access: AccessSize) -> MemResult<()> {
        if addr.is_multiple_of(access.bytes() as u64) {
            Ok(())
        } else {
            Err(MemError::Unaligned { addr, access })
        }
    }

    fn bounds_check(&self, addr: u64, len: usize, access: AccessSize) -> MemResult<usize> {
        let out_of_range = MemError::OutOfRange { addr, access };
        let relative = addr.checked_sub(self.base_addr).ok_or(out_of_range)?;
        let relative = usize::try_from(relative).map_err(|_| out_of_range)?;
        let end = relative.checked_add(len).ok_or(out_of_range)?;
        if end > self.data.len() {
            return Err(out_of_range);
        }
        Ok(relative)
    }

    fn slice(&self, addr: u64, access: AccessSize) -> MemResult<&[u8]> {
        Self::ensure_aligned(addr, access)?;
        let idx = self.bounds_check(addr, access.bytes(), access)?;
        Ok(&self.data[idx..idx + access.bytes()])
    }

    fn slice_mut(&mut self, addr: u64, access: AccessSize) -> MemResult<&mut [u8]> {
        Self::ensure_aligned(addr, access)?;
        let idx = self.bounds_check(addr, access.bytes(), access)?;
        Ok(&mut self.data[idx..idx + access.bytes()])
    }

    /// 批量写入
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> MemResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let start = self.bounds_check(addr, data.len(), AccessSize::Byte)?;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// 批量读取，返回副本
    pub fn read_bytes(&self, addr: u64, len: usize) -> MemResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = self.bounds_check(addr, len, AccessSize::Byte)?;
        Ok(self.data[start..start + len].to_vec())
    }

    /// 将指定范围填充为固定字节
    pub fn fill(&mut self, addr: u64, len: usize, value: u8) -> MemResult<()> {
        if len == 0 {
            return Ok(());
        }
        let start = self.bounds_check(addr, len, AccessSize::Byte)?;
        self.data[start..start + len].fill(value);
        Ok(())
    }
}

impl Memory for FlatMemory {
    fn load8(&self, addr: u64) -> MemResult<u8> {
        let idx = self.bounds_check(addr, 1, AccessSize::Byte)?;
        Ok(self.data[idx])
    }

    fn load16(&self, addr: u64) -> MemResult<u16> {
        let s = self.slice(addr, AccessSize::Half)?;
        Ok(u16::from_le_bytes([s[0], s[1]]))
    }

    fn load32(&self, addr: u64) -> MemResult<u32> {
        let s = self.slice(addr, AccessSize::Word)?;
        Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    fn load64(&self, addr: u64) -> MemResult<u64> {
        let s = self.slice(addr, AccessSize::Double)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(s);
        Ok(u64::from_le_bytes(bytes))
    }

    fn store8(&mut self, addr: u64, value: u8) -> MemResult<()> {
        let idx = self.bounds_check(addr, 1, AccessSize::Byte)?;
        self.data[idx] = value;
        Ok(())
    }

    fn store16(&mut self, addr: u64, value: u16) -> MemResult<()> {
        self.slice_mut(addr, AccessSize::Half)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn store32(&mut self, addr: u64, value: u32) -> MemResult<()> {
        self.slice_mut(addr, AccessSize::Word)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn store64(&mut self, addr: u64, value: u64) -> MemResult<()> {
        self.slice_mut(addr, AccessSize::Double)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

/// 物理地址空间：若干互不重叠的线性区域
#[derive(Default)]
pub struct MemoryMap {
    regions: Vec<FlatMemory>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单一区域的地址空间
    pub fn with_ram(base: u64, size: usize) -> Self {
        MemoryMap {
            regions: vec![FlatMemory::new(size, base)],
        }
    }

    /// 添加一个区域，与已有区域重叠时报错
    pub fn add_region(&mut self, region: FlatMemory) -> MemResult<()> {
        let base = region.base_addr();
        let end = base.saturating_add(region.size() as u64);
        let overlaps = self.regions.iter().any(|r| {
            let r_end = r.base_addr().saturating_add(r.size() as u64);
            base < r_end && r.base_addr() < end
        });
        if overlaps {
            return Err(MemError::Overlap {
                base,
                size: region.size() as u64,
            });
        }
        log::debug!("mapped region 0x{:016x}..0x{:016x}", base, end);
        self.regions.push(region);
        Ok(())
    }

    /// 地址是否已映射
    pub fn contains(&self, addr: u64) -> bool {
        self.regions.iter().any(|r| r.contains(addr))
    }

    pub fn regions(&self) -> &[FlatMemory] {
        &self.regions
    }

    fn region(&self, addr: u64, access: AccessSize) -> MemResult<&FlatMemory> {
        self.regions
            .iter()
            .find(|r| r.contains(addr))
            .ok_or(MemError::OutOfRange { addr, access })
    }

    fn region_mut(&mut self, addr: u64, access: AccessSize) -> MemResult<&mut FlatMemory> {
        self.regions
            .iter_mut()
            .find(|r| r.contains(addr))
            .ok_or(MemError::OutOfRange { addr, access })
    }

    /// 批量写入，不允许跨区域
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> MemResult<()> {
        self.region_mut(addr, AccessSize::Byte)?.write_bytes(addr, data)
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> MemResult<Vec<u8>> {
        self.region(addr, AccessSize::Byte)?.read_bytes(addr, len)
    }
}

impl Memory for MemoryMap {
    fn load8(&self, addr: u64) -> MemResult<u8> {
        self.region(addr, AccessSize::Byte)?.load8(addr)
    }

    fn load16(&self, addr: u64) -> MemResult<u16> {
        self.region(addr, AccessSize::Half)?.load16(addr)
    }

    fn load32(&self, addr: u64) -> MemResult<u32> {
        self.region(addr, AccessSize::Word)?.load32(addr)
    }

    fn load64(&self, addr: u64) -> MemResult<u64> {
        self.region(addr, AccessSize::Double)?.load64(addr)
    }

    fn store8(&mut self, addr: u64, value: u8) -> MemResult<()> {
        self.region_mut(addr, AccessSize::Byte)?.store8(addr, value)
    }

    fn store16(&mut self, addr: u64, value: u16) -> MemResult<()> {
        self.region_mut(addr, AccessSize::Half)?.store16(addr, value)
    }

    fn store32(&mut self, addr: u64, value: u32) -> MemResult<()> {
        self.region_mut(addr, AccessSize::Word)?.store32(addr, value)
    }

    fn store64(&mut self, addr: u64, value: u64) -> MemResult<()> {
        self.region_mut(addr, AccessSize::Double)?.store64(addr, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_memory_basic() {
        let mut mem = FlatMemory::new(1024, 0);

        mem.store8(0, 0x12).unwrap();
        assert_eq!(mem.load8(0).unwrap(), 0x12);

        // 小端序
        mem.store16(2, 0x3456).unwrap();
        assert_eq!(mem.load8(2).unwrap(), 0x56);
        assert_eq!(mem.load8(3).unwrap(), 0x34);

        mem.store64(8, 0x0123_4567_89AB_CDEF).unwrap();
        assert_eq!(mem.load32(8).unwrap(), 0x89AB_CDEF);
        assert_eq!(mem.load32(12).unwrap(), 0x0123_4567);
        assert_eq!(mem.load(8, AccessSize::Double).unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_unaligned_access() {
        let mem = FlatMemory::new(1024, 0);
        assert!(matches!(mem.load16(1), Err(MemError::Unaligned { .. })));
        assert!(matches!(mem.load64(4), Err(MemError::Unaligned { .. })));
    }

    #[test]
    fn test_out_of_bounds() {
        let mem = FlatMemory::new(1024, 0x1000);
        assert!(matches!(mem.load8(0xFFF), Err(MemError::OutOfRange { .. })));
        assert!(matches!(mem.load32(0x1400), Err(MemError::OutOfRange { .. })));
    }

    #[test]
    fn test_memory_map_regions() {
        let mut map = MemoryMap::with_ram(0x8000_0000, 0x1000);
        map.add_region(FlatMemory::new(0x100, 0x1000)).unwrap();
        assert!(matches!(
            map.add_region(FlatMemory::new(0x100, 0x8000_0F00)),
            Err(MemError::Overlap { .. })
        ));

        map.store32(0x1004, 0xDEADBEEF).unwrap();
        map.store32(0x8000_0004, 0xCAFEBABE).unwrap();
        assert_eq!(map.load32(0x1004).unwrap(), 0xDEADBEEF);
        assert_eq!(map.load32(0x8000_0004).unwrap(), 0xCAFEBABE);
        assert!(map.contains(0x10FF));
        assert!(!map.contains(0x1100));
        assert!(matches!(map.load8(0x2000), Err(MemError::OutOfRange { .. })));
    }
}
