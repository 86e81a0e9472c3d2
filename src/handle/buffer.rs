//! Growable in-memory byte store
//!
//! # Layout
//!
//! ```text
//! 0                cursor           length                capacity
//! |================|================|.......................|
//!  valid data                        allocated, not yet valid
//! ```
//!
//! `cursor <= length <= capacity` always holds. When an operation needs a
//! length beyond the capacity the storage is reallocated to
//! `max(new_length, 2 * capacity)` and `[0, length)` is copied over, so
//! writing M bytes sequentially reallocates O(log M) times.
//!
//! Bytes between the old and new length are zero whenever the length is
//! extended without being written (seek or `set_len` past the end), even if
//! a previous truncation left stale bytes in the spare capacity.
//!
//! The valid region is only reachable through [`GrowableBuffer::as_slice`]
//! and [`GrowableBuffer::as_mut_slice`]. Both borrow the buffer, so the
//! compiler rules out a resize while a view is alive.

use crate::error::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GrowableBuffer {
    /// Allocated storage; `data.len()` is the capacity
    data: Vec<u8>,
    length: usize,
    cursor: usize,
    growths: usize,
}

impl GrowableBuffer {
    /// An empty buffer with `capacity` bytes allocated
    ///
    /// Panics if the allocation fails, like `Vec::with_capacity`. Use
    /// [`try_with_capacity`](Self::try_with_capacity) for untrusted sizes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            length: 0,
            cursor: 0,
            growths: 0,
        }
    }

    /// An empty buffer with `capacity` bytes allocated, or `AllocationFailure`
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            data: zeroed(capacity)?,
            length: 0,
            cursor: 0,
            growths: 0,
        })
    }

    /// Adopt `bytes` as the initial content; length and capacity both equal its size
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let length = bytes.len();
        Self {
            data: bytes,
            length,
            cursor: 0,
            growths: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.length - self.cursor
    }

    /// Number of reallocations since construction
    pub fn growth_count(&self) -> usize {
        self.growths
    }

    /// Move the cursor; returns false (and does nothing) if `pos > len()`
    pub fn set_position(&mut self, pos: usize) -> bool {
        if pos > self.length {
            return false;
        }
        self.cursor = pos;
        true
    }

    /// Truncate or zero-extend to `new_len`, growing the storage if needed
    pub fn set_len(&mut self, new_len: usize) -> Result<()> {
        if new_len > self.length {
            self.ensure_capacity(new_len)?;
            self.data[self.length..new_len].fill(0);
        }
        self.length = new_len;
        self.cursor = self.cursor.min(new_len);
        Ok(())
    }

    /// Copy up to `buf.len()` bytes from the cursor; returns the count
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }

    /// Copy all of `buf` in at the cursor, extending the length as needed
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        let end = self.cursor.checked_add(buf.len()).ok_or_else(|| {
            Error::AllocationFailure(format!("{} + {} bytes overflows", self.cursor, buf.len()))
        })?;
        if end > self.length {
            self.ensure_capacity(end)?;
            self.length = end;
        }
        self.data[self.cursor..end].copy_from_slice(buf);
        self.cursor = end;
        Ok(())
    }

    /// Borrow the valid region `[0, len())`
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// Mutably borrow the valid region; the length cannot change while it is held
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.length]
    }

    /// Give up the storage, trimmed to the valid region
    pub fn into_vec(mut self) -> Vec<u8> {
        self.data.truncate(self.length);
        self.data
    }

    fn ensure_capacity(&mut self, needed: usize) -> Result<()> {
        let capacity = self.data.len();
        if needed <= capacity {
            return Ok(());
        }
        let doubled = needed.max(capacity.saturating_mul(2));
        // Settle for the exact need when doubling cannot be satisfied
        let mut grown = zeroed(doubled).or_else(|_| zeroed(needed))?;
        let new_capacity = grown.len();
        grown[..self.length].copy_from_slice(&self.data[..self.length]);
        self.data = grown;
        self.growths += 1;
        debug!(
            old_capacity = capacity,
            new_capacity,
            length = self.length,
            "Grew in-memory buffer"
        );
        Ok(())
    }
}

/// A zero-filled vector of `size` bytes, failing instead of aborting
fn zeroed(size: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|e| Error::AllocationFailure(format!("cannot allocate {} bytes: {}", size, e)))?;
    data.resize(size, 0);
    Ok(data)
}
