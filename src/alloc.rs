//! Allocation strategy for file-backed byte ranges
//!
//! A file-backed handle materializes a byte range either as a memory-mapped
//! view or as a heap copy. Which one is a policy decision made here, not in
//! the handle:
//!
//! ```text
//! FileHandle::region(start, size, mode)
//!   └─→ AllocationStrategy::allocate(file, mode, start, size)
//!        ├─→ Region (Mapped / MappedMut)   mapped_buffers = true
//!        └─→ Region (Heap)                 mapped_buffers = false (default)
//! ```
//!
//! Heap allocation is the default: mapping misbehaves on some
//! platform/filesystem combinations (network filesystems fault when the
//! file is truncated under the map, some systems unmap lazily).
//!
//! A [`Region`] borrows the file it came from, so it can never outlive the
//! handle that owns that file.

use crate::error::{Error, Result};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::ops::Deref;
use tracing::debug;

/// How a mapped region relates to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Read-only view
    ReadOnly,
    /// Writes go through to the file
    ReadWrite,
    /// Copy-on-write; writes stay private to the region
    Private,
}

impl MapMode {
    /// Whether the file itself must be writable
    pub fn needs_writable_file(self) -> bool {
        self == MapMode::ReadWrite
    }
}

enum RegionData {
    Heap(Vec<u8>),
    Mapped(Mmap),
    MappedMut(MmapMut),
}

/// A materialized byte range of a file
pub struct Region<'a> {
    start: u64,
    data: RegionData,
    _file: PhantomData<&'a File>,
}

impl<'a> Region<'a> {
    fn new(start: u64, data: RegionData) -> Self {
        Self {
            start,
            data,
            _file: PhantomData,
        }
    }

    /// Absolute file offset of the first byte
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn is_mapped(&self) -> bool {
        !matches!(self.data, RegionData::Heap(_))
    }

    /// Mutable access, for heap copies and writable or private maps
    ///
    /// Heap copies are detached: edits never reach the file.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match &mut self.data {
            RegionData::Heap(v) => Some(v.as_mut_slice()),
            RegionData::MappedMut(m) => Some(&mut m[..]),
            RegionData::Mapped(_) => None,
        }
    }

    /// Flush a writable map to the file; a no-op for other regions
    pub fn flush(&self) -> Result<()> {
        if let RegionData::MappedMut(m) = &self.data {
            m.flush()?;
        }
        Ok(())
    }
}

impl Deref for Region<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.data {
            RegionData::Heap(v) => v.as_slice(),
            RegionData::Mapped(m) => &m[..],
            RegionData::MappedMut(m) => &m[..],
        }
    }
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("start", &self.start)
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// Decides how a file byte range is materialized
pub trait AllocationStrategy: fmt::Debug + Send + Sync {
    /// Materialize `[start, start + size)` of `file`
    ///
    /// Fails with `AllocationFailure` when mapping or reading fails.
    fn allocate<'a>(&self, file: &'a File, mode: MapMode, start: u64, size: usize) -> Result<Region<'a>>;
}

/// Maps when `mapped` is set, otherwise copies onto the heap
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocationStrategy {
    mapped: bool,
}

impl DefaultAllocationStrategy {
    pub fn new(mapped: bool) -> Self {
        Self { mapped }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Copy the range onto the heap; a range running past end of file yields
    /// only the bytes that exist
    fn allocate_heap<'a>(file: &'a File, start: u64, size: usize) -> Result<Region<'a>> {
        let file_len = file
            .metadata()
            .map_err(|e| Error::AllocationFailure(format!("stat failed: {}", e)))?
            .len();
        let available = usize::try_from(file_len.saturating_sub(start)).unwrap_or(usize::MAX);
        let size = size.min(available);

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|e| Error::AllocationFailure(format!("cannot allocate {} bytes: {}", size, e)))?;
        data.resize(size, 0);

        let mut reader = file;
        reader
            .seek(SeekFrom::Start(start))
            .map_err(|e| Error::AllocationFailure(format!("seek to {} failed: {}", start, e)))?;

        let mut filled = 0;
        while filled < size {
            let n = reader
                .read(&mut data[filled..])
                .map_err(|e| Error::AllocationFailure(format!("read at {} failed: {}", start, e)))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data.truncate(filled);
        Ok(Region::new(start, RegionData::Heap(data)))
    }

    fn allocate_mapped<'a>(file: &'a File, mode: MapMode, start: u64, size: usize) -> Result<Region<'a>> {
        let file_len = file
            .metadata()
            .map_err(|e| Error::AllocationFailure(format!("stat failed: {}", e)))?
            .len();
        let end = start.saturating_add(size as u64);
        if end > file_len {
            return Err(Error::AllocationFailure(format!(
                "range {}..{} exceeds file length {}",
                start, end, file_len
            )));
        }
        if size == 0 {
            return Ok(Region::new(start, RegionData::Heap(Vec::new())));
        }

        let mut options = MmapOptions::new();
        options.offset(start).len(size);
        let map_err = |e: std::io::Error| Error::AllocationFailure(format!("mmap failed: {}", e));

        // SAFETY: mapping a file is unsafe because another process may modify
        // or truncate it while mapped. The bounds were checked against the
        // current length above, and the Region borrows the file so the map
        // cannot outlive the handle that owns it.
        let data = unsafe {
            match mode {
                MapMode::ReadOnly => RegionData::Mapped(options.map(file).map_err(map_err)?),
                MapMode::ReadWrite => RegionData::MappedMut(options.map_mut(file).map_err(map_err)?),
                MapMode::Private => RegionData::MappedMut(options.map_copy(file).map_err(map_err)?),
            }
        };
        Ok(Region::new(start, data))
    }
}

impl AllocationStrategy for DefaultAllocationStrategy {
    fn allocate<'a>(&self, file: &'a File, mode: MapMode, start: u64, size: usize) -> Result<Region<'a>> {
        debug!(mapped = self.mapped, ?mode, start, size, "Allocating file region");
        if self.mapped {
            Self::allocate_mapped(file, mode, start, size)
        } else {
            Self::allocate_heap(file, start, size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file(dir: &tempfile::TempDir, contents: &[u8]) -> Result<File> {
        let path = dir.path().join("region.bin");
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(contents)?;
        Ok(file)
    }

    #[test]
    fn test_heap_region() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"0123456789")?;
        let strategy = DefaultAllocationStrategy::default();

        let region = strategy.allocate(&file, MapMode::ReadOnly, 2, 4)?;
        assert!(!region.is_mapped());
        assert_eq!(region.start(), 2);
        assert_eq!(&region[..], b"2345");
        Ok(())
    }

    #[test]
    fn test_heap_region_short_at_eof() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"0123456789")?;
        let region = DefaultAllocationStrategy::new(false).allocate(&file, MapMode::ReadOnly, 8, 10)?;
        assert_eq!(&region[..], b"89");
        Ok(())
    }

    #[test]
    fn test_heap_region_rest_of_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"abcd")?;
        let strategy = DefaultAllocationStrategy::new(false);

        let region = strategy.allocate(&file, MapMode::ReadOnly, 0, usize::MAX)?;
        assert_eq!(&region[..], b"abcd");

        let past_end = strategy.allocate(&file, MapMode::ReadOnly, 100, usize::MAX)?;
        assert!(past_end.is_empty());
        Ok(())
    }

    #[test]
    fn test_mapped_region() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"0123456789")?;
        let strategy = DefaultAllocationStrategy::new(true);

        let region = strategy.allocate(&file, MapMode::ReadOnly, 3, 5)?;
        assert!(region.is_mapped());
        assert_eq!(&region[..], b"34567");
        Ok(())
    }

    #[test]
    fn test_mapped_write_through() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"aaaa")?;
        let strategy = DefaultAllocationStrategy::new(true);
        {
            let mut region = strategy.allocate(&file, MapMode::ReadWrite, 1, 2)?;
            if let Some(bytes) = region.as_mut_slice() {
                bytes.copy_from_slice(b"bb");
            }
            region.flush()?;
        }
        let check = strategy.allocate(&file, MapMode::ReadOnly, 0, 4)?;
        assert_eq!(&check[..], b"abba");
        Ok(())
    }

    #[test]
    fn test_mapped_past_end_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"short")?;
        let err = DefaultAllocationStrategy::new(true)
            .allocate(&file, MapMode::ReadOnly, 2, 10)
            .unwrap_err();
        assert!(matches!(err, Error::AllocationFailure(_)));
        Ok(())
    }

    #[test]
    fn test_read_only_map_is_immutable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = sample_file(&dir, b"data")?;
        let mut region = DefaultAllocationStrategy::new(true).allocate(&file, MapMode::ReadOnly, 0, 4)?;
        assert!(region.as_mut_slice().is_none());
        Ok(())
    }
}
