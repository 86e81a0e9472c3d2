//! Data handles
//!
//! # Contract
//!
//! Every [`DataHandle`] implements the same byte-exact contract regardless
//! of what backs it:
//!
//! ```text
//! read(buf)          best effort: returns min(buf.len(), remaining), 0 at end
//! read_fully(buf)    all or EndOfStream, cursor untouched on failure
//! read_u32() ...     fixed width, same as read_fully, decoded per order()
//! read_utf()         u16 length prefix (per order()) + UTF-8 payload
//! seek(pos)          read-only: pos > length is OutOfRange
//!                    writable:  pos > length zero-extends to pos
//! close()            idempotent; every later I/O call fails with Closed
//! ```
//!
//! The byte order is consulted at call time, so switching it affects the
//! next multi-byte read or write and nothing already written.
//!
//! Handles are not thread-safe. Share one only behind external
//! synchronization.

use crate::error::{Error, Result};
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod buffer;
pub mod bytes;
pub mod file;
pub mod resolver;

pub use self::bytes::{BytesHandle, BytesHandleFactory};
pub use buffer::GrowableBuffer;
pub use file::{FileHandle, FileHandleFactory};
pub use resolver::{HandleFactory, HandleResolver};

/// Interpretation of multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    #[serde(rename = "big", alias = "be", alias = "big_endian")]
    BigEndian,
    #[serde(rename = "little", alias = "le", alias = "little_endian")]
    LittleEndian,
}

impl ByteOrder {
    /// Byte order of the host
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::BigEndian
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::BigEndian => f.write_str("big"),
            ByteOrder::LittleEndian => f.write_str("little"),
        }
    }
}

impl FromStr for ByteOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" | "be" | "big_endian" => Ok(ByteOrder::BigEndian),
            "little" | "le" | "little_endian" => Ok(ByteOrder::LittleEndian),
            other => Err(Error::InvalidArgument(format!("unknown byte order '{}'", other))),
        }
    }
}

macro_rules! order_codec {
    ($($ty:ty => $decode:ident, $encode:ident;)*) => {
        impl ByteOrder {
            $(
                pub fn $decode(self, bytes: [u8; std::mem::size_of::<$ty>()]) -> $ty {
                    match self {
                        ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
                        ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
                    }
                }

                pub fn $encode(self, value: $ty) -> [u8; std::mem::size_of::<$ty>()] {
                    match self {
                        ByteOrder::BigEndian => value.to_be_bytes(),
                        ByteOrder::LittleEndian => value.to_le_bytes(),
                    }
                }
            )*
        }
    };
}

order_codec! {
    u16 => decode_u16, encode_u16;
    i16 => decode_i16, encode_i16;
    u32 => decode_u32, encode_u32;
    i32 => decode_i32, encode_i32;
    u64 => decode_u64, encode_u64;
    i64 => decode_i64, encode_i64;
}

/// Whether a handle may modify its backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        self == AccessMode::ReadWrite
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("r"),
            AccessMode::ReadWrite => f.write_str("rw"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(AccessMode::Read),
            "rw" => Ok(AccessMode::ReadWrite),
            other => Err(Error::InvalidArgument(format!(
                "{} mode not in supported modes ('r', 'rw')",
                other
            ))),
        }
    }
}

/// Typed random-access reader/writer bound to one Location
///
/// Implementors supply the raw primitives; the typed methods are provided
/// on top of them and must not be overridden with different semantics.
pub trait DataHandle: fmt::Debug + Send {
    /// The location this handle was opened on
    fn location(&self) -> &Arc<dyn Location>;

    fn mode(&self) -> AccessMode;

    fn is_closed(&self) -> bool;

    /// Release the backing resources; calling it again is a no-op
    fn close(&mut self) -> Result<()>;

    /// Current cursor position
    fn offset(&self) -> Result<u64>;

    /// Logical end of valid data
    fn length(&self) -> Result<u64>;

    /// Truncate or zero-extend; the cursor is clamped to the new length
    fn set_length(&mut self, length: u64) -> Result<()>;

    /// Byte order used by subsequent multi-byte reads and writes
    fn order(&self) -> ByteOrder;

    fn set_order(&mut self, order: ByteOrder);

    /// Read up to `buf.len()` bytes; returns the count, 0 at end of data
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `buf` at the cursor, extending the length as needed
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    fn seek(&mut self, pos: u64) -> Result<()>;

    // -- Provided --

    fn remaining(&self) -> Result<u64> {
        Ok(self.length()?.saturating_sub(self.offset()?))
    }

    /// Fill `buf` completely or fail with `EndOfStream` without moving the cursor
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        let available = self.remaining()?;
        if (buf.len() as u64) > available {
            return Err(Error::EndOfStream {
                needed: buf.len() as u64,
                available,
            });
        }
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(Error::EndOfStream {
                    needed: buf.len() as u64,
                    available: filled as u64,
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Seek back to the start
    fn reset(&mut self) -> Result<()> {
        self.seek(0)
    }

    /// Advance up to `n` bytes, never past the end; returns the distance moved
    fn skip_bytes(&mut self, n: u64) -> Result<u64> {
        let skipped = n.min(self.remaining()?);
        let offset = self.offset()?;
        self.seek(offset + skipped)?;
        Ok(skipped)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let [b] = read_array::<1, Self>(self)?;
        Ok(b)
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = read_array::<2, Self>(self)?;
        Ok(self.order().decode_u16(bytes))
    }

    fn read_i16(&mut self) -> Result<i16> {
        let bytes = read_array::<2, Self>(self)?;
        Ok(self.order().decode_i16(bytes))
    }

    /// A UTF-16 code unit
    fn read_char(&mut self) -> Result<u16> {
        self.read_u16()
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = read_array::<4, Self>(self)?;
        Ok(self.order().decode_u32(bytes))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let bytes = read_array::<4, Self>(self)?;
        Ok(self.order().decode_i32(bytes))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = read_array::<8, Self>(self)?;
        Ok(self.order().decode_u64(bytes))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let bytes = read_array::<8, Self>(self)?;
        Ok(self.order().decode_i64(bytes))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Length-prefixed UTF-8 string; the cursor is restored on failure
    fn read_utf(&mut self) -> Result<String> {
        let start = self.offset()?;
        let result = self.read_u16().and_then(|len| {
            let mut payload = vec![0u8; len as usize];
            self.read_fully(&mut payload)?;
            String::from_utf8(payload)
                .map_err(|e| Error::InvalidArgument(format!("invalid UTF-8 payload: {}", e)))
        });
        if result.is_err() && !self.is_closed() {
            self.seek(start)?;
        }
        result
    }

    /// Bytes up to the next `\n` (a trailing `\r` is dropped); `None` at end of data
    ///
    /// Decoding is strict like [`read_utf`](Self::read_utf): a line that is
    /// not valid UTF-8 is an `InvalidArgument` and the cursor is restored.
    fn read_line(&mut self) -> Result<Option<String>> {
        if self.remaining()? == 0 {
            return Ok(None);
        }
        let start = self.offset()?;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while self.read(&mut byte)? == 1 {
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        match String::from_utf8(line) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                self.seek(start)?;
                Err(Error::InvalidArgument(format!("invalid UTF-8 line: {}", e)))
            }
        }
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write(&[v])
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        let bytes = self.order().encode_u16(v);
        self.write(&bytes)
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        let bytes = self.order().encode_i16(v);
        self.write(&bytes)
    }

    fn write_char(&mut self, v: u16) -> Result<()> {
        self.write_u16(v)
    }

    /// Every UTF-16 code unit of `s`, two bytes each, no prefix
    fn write_chars(&mut self, s: &str) -> Result<()> {
        let order = self.order();
        let encoded: Vec<u8> = s.encode_utf16().flat_map(|c| order.encode_u16(c)).collect();
        self.write(&encoded)
    }

    /// The raw UTF-8 bytes of `s`, no prefix
    fn write_str_bytes(&mut self, s: &str) -> Result<()> {
        self.write(s.as_bytes())
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        let bytes = self.order().encode_u32(v);
        self.write(&bytes)
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        let bytes = self.order().encode_i32(v);
        self.write(&bytes)
    }

    fn write_u64(&mut self, v: u64) -> Result<()> {
        let bytes = self.order().encode_u64(v);
        self.write(&bytes)
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        let bytes = self.order().encode_i64(v);
        self.write(&bytes)
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_u32(v.to_bits())
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_u64(v.to_bits())
    }

    /// u16 length prefix followed by the UTF-8 bytes of `s`
    fn write_utf(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len()).map_err(|_| {
            Error::InvalidArgument(format!(
                "string of {} bytes exceeds the {} byte limit",
                s.len(),
                u16::MAX
            ))
        })?;
        let mut encoded = Vec::with_capacity(2 + s.len());
        encoded.extend_from_slice(&self.order().encode_u16(len));
        encoded.extend_from_slice(s.as_bytes());
        self.write(&encoded)
    }
}

/// Exact fixed-width read shared by the typed readers
fn read_array<const N: usize, H: DataHandle + ?Sized>(handle: &mut H) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    handle.read_fully(&mut bytes)?;
    Ok(bytes)
}

/// Fail with `Closed` when `closed` is set
pub(crate) fn ensure_open(closed: bool) -> Result<()> {
    if closed {
        Err(Error::Closed)
    } else {
        Ok(())
    }
}

/// Fail with `ReadOnlyViolation` unless `mode` allows writes
pub(crate) fn ensure_writable(mode: AccessMode) -> Result<()> {
    if mode.is_writable() {
        Ok(())
    } else {
        Err(Error::ReadOnlyViolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec() {
        assert_eq!(ByteOrder::BigEndian.encode_u32(0x01020304), [1, 2, 3, 4]);
        assert_eq!(ByteOrder::LittleEndian.encode_u32(0x01020304), [4, 3, 2, 1]);
        assert_eq!(ByteOrder::LittleEndian.decode_u16([0x04, 0x00]), 4);
        assert_eq!(ByteOrder::BigEndian.decode_i16([0xff, 0xfe]), -2);
        assert_eq!(
            ByteOrder::LittleEndian.decode_i64(ByteOrder::LittleEndian.encode_i64(-7)),
            -7
        );
    }

    #[test]
    fn test_parse_order_and_mode() -> Result<()> {
        assert_eq!("LE".parse::<ByteOrder>()?, ByteOrder::LittleEndian);
        assert_eq!("big".parse::<ByteOrder>()?, ByteOrder::BigEndian);
        assert!("middle".parse::<ByteOrder>().is_err());

        assert_eq!("r".parse::<AccessMode>()?, AccessMode::Read);
        assert_eq!("rw".parse::<AccessMode>()?, AccessMode::ReadWrite);
        assert!("w".parse::<AccessMode>().is_err());
        Ok(())
    }

    #[test]
    fn test_native_order_matches_target() {
        let expected = if u16::from_ne_bytes([1, 0]) == 1 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        assert_eq!(ByteOrder::native(), expected);
    }
}
