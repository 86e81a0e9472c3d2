//! File-backed data handle
//!
//! A thin adapter over [`std::fs::File`]. The handle keeps its own cursor
//! and seeks the OS file before every transfer, so length, seek and raw
//! reads/writes map straight onto OS calls while typed values go through the
//! byte-order-aware codec shared with every other handle.
//!
//! Byte ranges can also be materialized as a [`Region`] through the
//! configured [`AllocationStrategy`]; regions borrow the handle, so they are
//! always released before it is closed or dropped.

use super::resolver::HandleFactory;
use super::{ensure_open, ensure_writable, AccessMode, ByteOrder, DataHandle};
use crate::alloc::{AllocationStrategy, DefaultAllocationStrategy, MapMode, Region};
use crate::config::IoConfig;
use crate::error::{Error, Result};
use crate::location::{FileLocation, Location};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct FileHandle {
    /// `None` once closed
    file: Option<File>,
    path: PathBuf,
    location: Arc<dyn Location>,
    mode: AccessMode,
    order: ByteOrder,
    pos: u64,
    strategy: Arc<dyn AllocationStrategy>,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("order", &self.order)
            .field("pos", &self.pos)
            .field("closed", &self.file.is_none())
            .finish()
    }
}

impl FileHandle {
    /// Open a handle on a file location
    ///
    /// Read mode requires the file to exist; read-write mode creates it if
    /// missing and never truncates.
    pub fn open(
        location: Arc<dyn Location>,
        mode: AccessMode,
        strategy: Arc<dyn AllocationStrategy>,
    ) -> Result<Self> {
        let path = location
            .downcast_ref::<FileLocation>()
            .ok_or_else(|| Error::UnsupportedLocationType(location.kind().to_string()))?
            .file_path()
            .to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .create(mode.is_writable())
            .open(&path)?;

        info!(path = %path.display(), mode = %mode, "Opened file handle");

        Ok(Self {
            file: Some(file),
            path,
            location,
            mode,
            order: ByteOrder::default(),
            pos: 0,
            strategy,
        })
    }

    /// Open `path` directly with heap-allocated regions
    pub fn open_path<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        Self::open(
            Arc::new(FileLocation::new(path)),
            mode,
            Arc::new(DefaultAllocationStrategy::default()),
        )
    }

    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Materialize `[start, start + size)` through the allocation strategy
    pub fn region(&self, start: u64, size: usize, map_mode: MapMode) -> Result<Region<'_>> {
        let file = self.file()?;
        if map_mode.needs_writable_file() {
            ensure_writable(self.mode)?;
        }
        self.strategy.allocate(file, map_mode, start, size)
    }

    /// Flush data and metadata to disk
    pub fn sync(&self) -> Result<()> {
        self.file()?.sync_all()?;
        Ok(())
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(Error::Closed)
    }

    /// The OS file, positioned at the handle's cursor
    fn positioned(&mut self) -> Result<&mut File> {
        let pos = self.pos;
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        file.seek(SeekFrom::Start(pos))?;
        Ok(file)
    }
}

impl DataHandle for FileHandle {
    fn location(&self) -> &Arc<dyn Location> {
        &self.location
    }

    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            if self.mode.is_writable() {
                file.sync_data()?;
            }
            drop(file);
            debug!(path = %self.path.display(), "Closed file handle");
        }
        Ok(())
    }

    fn offset(&self) -> Result<u64> {
        ensure_open(self.file.is_none())?;
        Ok(self.pos)
    }

    fn length(&self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        let file = self.file()?;
        ensure_writable(self.mode)?;
        file.set_len(length)?;
        self.pos = self.pos.min(length);
        Ok(())
    }

    fn order(&self) -> ByteOrder {
        self.order
    }

    fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.length()?.saturating_sub(self.pos);
        let wanted = (buf.len() as u64).min(available) as usize;
        if wanted == 0 {
            return Ok(0);
        }

        let file = self.positioned()?;
        let mut filled = 0;
        while filled < wanted {
            match file.read(&mut buf[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.pos += filled as u64;
        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        ensure_open(self.file.is_none())?;
        ensure_writable(self.mode)?;
        self.positioned()?.write_all(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        let length = self.length()?;
        if pos > length {
            if !self.mode.is_writable() {
                return Err(Error::OutOfRange { pos, length });
            }
            // The OS zero-fills the extension
            self.file()?.set_len(pos)?;
        }
        self.pos = pos;
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "Error closing file handle");
        }
    }
}

/// Opens [`FileHandle`]s on file locations
#[derive(Debug, Clone)]
pub struct FileHandleFactory {
    order: ByteOrder,
    strategy: Arc<dyn AllocationStrategy>,
}

impl FileHandleFactory {
    pub fn new(config: &IoConfig, strategy: Arc<dyn AllocationStrategy>) -> Self {
        Self {
            order: config.default_order,
            strategy,
        }
    }
}

impl Default for FileHandleFactory {
    fn default() -> Self {
        let config = IoConfig::default();
        let strategy = Arc::new(DefaultAllocationStrategy::new(config.mapped_buffers));
        Self::new(&config, strategy)
    }
}

impl HandleFactory for FileHandleFactory {
    fn name(&self) -> &str {
        "file"
    }

    fn location_kind(&self) -> &'static str {
        FileLocation::KIND
    }

    fn open(&self, location: Arc<dyn Location>, mode: AccessMode) -> Result<Box<dyn DataHandle>> {
        let handle = FileHandle::open(location, mode, Arc::clone(&self.strategy))?;
        Ok(Box::new(handle.with_order(self.order)))
    }
}
