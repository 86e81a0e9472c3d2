//! In-memory data handle over a [`GrowableBuffer`]

use super::buffer::GrowableBuffer;
use super::resolver::HandleFactory;
use super::{ensure_open, ensure_writable, AccessMode, ByteOrder, DataHandle};
use crate::config::IoConfig;
use crate::error::{Error, Result};
use crate::location::{BytesLocation, Location};
use std::sync::Arc;
use tracing::debug;

/// Random-access handle over an owned, growable byte buffer
///
/// The buffer is exclusively owned by the handle. Callers reach the bytes
/// through [`bytes`](Self::bytes) / [`bytes_mut`](Self::bytes_mut), which
/// borrow the handle, or take a copy with [`to_vec`](Self::to_vec).
#[derive(Debug)]
pub struct BytesHandle {
    buffer: GrowableBuffer,
    location: Arc<dyn Location>,
    mode: AccessMode,
    order: ByteOrder,
    closed: bool,
}

impl BytesHandle {
    /// An empty writable handle sized and ordered per `config`
    pub fn new(config: &IoConfig) -> Self {
        Self::with_capacity(config.initial_capacity).with_order(config.default_order)
    }

    /// An empty writable handle with `capacity` bytes preallocated
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_buffer(
            GrowableBuffer::with_capacity(capacity),
            Arc::new(BytesLocation::unique()),
            AccessMode::ReadWrite,
        )
    }

    /// A writable handle adopting `bytes`; the length starts at `bytes.len()`
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::from_buffer(
            GrowableBuffer::from_vec(bytes),
            Arc::new(BytesLocation::unique()),
            AccessMode::ReadWrite,
        )
    }

    /// Open a handle on a `bytes:` location
    ///
    /// Locations carrying content start with a private copy of it; otherwise
    /// the buffer starts empty with the location's capacity, or the
    /// configured default.
    pub fn open(location: Arc<dyn Location>, mode: AccessMode, config: &IoConfig) -> Result<Self> {
        let bytes_location = location
            .downcast_ref::<BytesLocation>()
            .ok_or_else(|| Error::UnsupportedLocationType(location.kind().to_string()))?;

        let buffer = match bytes_location.content() {
            Some(content) => GrowableBuffer::from_vec(content.to_vec()),
            None => GrowableBuffer::try_with_capacity(
                bytes_location.capacity().unwrap_or(config.initial_capacity),
            )?,
        };

        debug!(location = %location, mode = %mode, length = buffer.len(), "Opened in-memory handle");
        Ok(Self::from_buffer(buffer, location, mode).with_order(config.default_order))
    }

    fn from_buffer(buffer: GrowableBuffer, location: Arc<dyn Location>, mode: AccessMode) -> Self {
        Self {
            buffer,
            location,
            mode,
            order: ByteOrder::default(),
            closed: false,
        }
    }

    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Make this handle read-only
    pub fn read_only(mut self) -> Self {
        self.mode = AccessMode::Read;
        self
    }

    /// Allocated size of the backing storage
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Number of times the backing storage has been reallocated
    pub fn growth_count(&self) -> usize {
        self.buffer.growth_count()
    }

    /// Borrow the valid bytes `[0, length)`
    ///
    /// The borrow blocks every `&mut self` call, so the buffer cannot be
    /// resized underneath it.
    pub fn bytes(&self) -> Result<&[u8]> {
        ensure_open(self.closed)?;
        Ok(self.buffer.as_slice())
    }

    /// Mutably borrow the valid bytes for in-place edits
    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        ensure_open(self.closed)?;
        ensure_writable(self.mode)?;
        Ok(self.buffer.as_mut_slice())
    }

    /// Copy out the valid bytes
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(self.bytes()?.to_vec())
    }

    /// Consume the handle, returning its valid bytes
    pub fn into_inner(self) -> Result<Vec<u8>> {
        ensure_open(self.closed)?;
        Ok(self.buffer.into_vec())
    }
}

impl DataHandle for BytesHandle {
    fn location(&self) -> &Arc<dyn Location> {
        &self.location
    }

    fn mode(&self) -> AccessMode {
        self.mode
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.buffer = GrowableBuffer::default();
            debug!(location = %self.location, "Closed in-memory handle");
        }
        Ok(())
    }

    fn offset(&self) -> Result<u64> {
        ensure_open(self.closed)?;
        Ok(self.buffer.position() as u64)
    }

    fn length(&self) -> Result<u64> {
        ensure_open(self.closed)?;
        Ok(self.buffer.len() as u64)
    }

    fn set_length(&mut self, length: u64) -> Result<()> {
        ensure_open(self.closed)?;
        ensure_writable(self.mode)?;
        self.buffer.set_len(to_usize(length)?)
    }

    fn order(&self) -> ByteOrder {
        self.order
    }

    fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        ensure_open(self.closed)?;
        Ok(self.buffer.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        ensure_open(self.closed)?;
        ensure_writable(self.mode)?;
        self.buffer.write(buf)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        ensure_open(self.closed)?;
        let length = self.buffer.len() as u64;
        if pos > length {
            if !self.mode.is_writable() {
                return Err(Error::OutOfRange { pos, length });
            }
            self.buffer.set_len(to_usize(pos)?)?;
        }
        self.buffer.set_position(pos as usize);
        Ok(())
    }
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{} exceeds addressable memory", value)))
}

/// Opens [`BytesHandle`]s on `bytes:` locations
#[derive(Debug, Clone, Default)]
pub struct BytesHandleFactory {
    config: IoConfig,
}

impl BytesHandleFactory {
    pub fn new(config: IoConfig) -> Self {
        Self { config }
    }
}

impl HandleFactory for BytesHandleFactory {
    fn name(&self) -> &str {
        "bytes"
    }

    fn location_kind(&self) -> &'static str {
        BytesLocation::KIND
    }

    fn open(&self, location: Arc<dyn Location>, mode: AccessMode) -> Result<Box<dyn DataHandle>> {
        Ok(Box::new(BytesHandle::open(location, mode, &self.config)?))
    }
}
