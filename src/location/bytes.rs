//! In-memory byte buffer locations
//!
//! Address grammar: `bytes:` followed by optional `key=value` pairs joined
//! with `&`. Recognised keys:
//! - `capacity` - initial capacity of the buffer a handle allocates
//! - `id` - identity token distinguishing otherwise identical buffers
//!
//! ```text
//! bytes:
//! bytes:capacity=4096
//! bytes:id=6f1c...&capacity=64
//! ```
//!
//! A location built with [`BytesLocation::from_bytes`] carries initial
//! content in-process. The content is never part of the address: resolving
//! the canonical string again gives an equal location (same `id`) whose
//! buffer starts empty.

use super::resolver::LocationFactory;
use super::Location;
use crate::error::{Error, Result};
use ::bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Address prefix claimed by [`BytesLocationFactory`]
pub const BYTES_PREFIX: &str = "bytes:";

#[derive(Debug, Clone, Default)]
pub struct BytesLocation {
    id: Option<Uuid>,
    capacity: Option<usize>,
    content: Option<Bytes>,
}

impl BytesLocation {
    pub const KIND: &'static str = "bytes";

    /// An anonymous buffer location (`bytes:`)
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer location with its own identity (`bytes:id=...`)
    pub fn unique() -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            ..Self::default()
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Wrap caller-supplied content; handles opened here start with a copy
    pub fn from_bytes(content: impl Into<Bytes>) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            capacity: None,
            content: Some(content.into()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let params = raw
            .strip_prefix(BYTES_PREFIX)
            .ok_or_else(|| Error::invalid_address(raw, "missing 'bytes:' prefix"))?;

        let mut location = Self::default();
        for pair in params.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::invalid_address(raw, format!("expected key=value, got '{}'", pair)))?;
            match key {
                "capacity" => {
                    let capacity = value.parse::<usize>().map_err(|e| {
                        Error::invalid_address(raw, format!("bad capacity '{}': {}", value, e))
                    })?;
                    location.capacity = Some(capacity);
                }
                "id" => {
                    let id = Uuid::parse_str(value)
                        .map_err(|e| Error::invalid_address(raw, format!("bad id '{}': {}", value, e)))?;
                    location.id = Some(id);
                }
                other => {
                    return Err(Error::invalid_address(raw, format!("unknown parameter '{}'", other)));
                }
            }
        }
        Ok(location)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Requested initial capacity, if the address names one
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Initial content, if this location wraps caller-supplied bytes
    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }
}

impl PartialEq for BytesLocation {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for BytesLocation {}

impl fmt::Display for BytesLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Location for BytesLocation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn path(&self) -> String {
        let mut params = Vec::with_capacity(2);
        if let Some(id) = self.id {
            params.push(format!("id={}", id));
        }
        if let Some(capacity) = self.capacity {
            params.push(format!("capacity={}", capacity));
        }
        format!("{}{}", BYTES_PREFIX, params.join("&"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct BytesLocationFactory;

impl LocationFactory for BytesLocationFactory {
    fn name(&self) -> &str {
        "bytes"
    }

    fn claims(&self, raw: &str) -> bool {
        raw.starts_with(BYTES_PREFIX)
    }

    fn create(&self, raw: &str) -> Result<Arc<dyn Location>> {
        Ok(Arc::new(BytesLocation::parse(raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() -> Result<()> {
        let loc = BytesLocation::parse("bytes:")?;
        assert_eq!(loc.capacity(), None);
        assert_eq!(loc.id(), None);
        assert_eq!(loc.path(), "bytes:");
        Ok(())
    }

    #[test]
    fn test_parse_capacity() -> Result<()> {
        let loc = BytesLocation::parse("bytes:capacity=4096")?;
        assert_eq!(loc.capacity(), Some(4096));
        assert_eq!(loc.path(), "bytes:capacity=4096");
        Ok(())
    }

    #[test]
    fn test_round_trip_with_id() -> Result<()> {
        let original = BytesLocation::from_bytes(vec![1u8, 2, 3]);
        let reparsed = BytesLocation::parse(&original.path())?;
        assert_eq!(original, reparsed);
        assert!(reparsed.content().is_none());
        Ok(())
    }

    #[test]
    fn test_distinct_content_not_equal() {
        let a = BytesLocation::from_bytes(vec![1u8]);
        let b = BytesLocation::from_bytes(vec![1u8]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_bad_parameters() {
        for raw in ["bytes:capacity=lots", "bytes:size=3", "bytes:capacity", "bytes:id=nope"] {
            assert!(
                matches!(BytesLocation::parse(raw), Err(Error::InvalidAddress { .. })),
                "{} should be rejected",
                raw
            );
        }
    }
}
