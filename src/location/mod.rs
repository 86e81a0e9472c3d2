//! Locations
//!
//! A [`Location`] describes where bytes live without saying how to read
//! them. Concrete variants:
//! - [`FileLocation`] - a local file path
//! - [`BytesLocation`] - an in-process byte buffer (`bytes:` addresses)
//! - [`RemoteLocation`] - a session-based remote store (`remote://host:port`)
//!
//! Locations are built from raw address strings by the [`LocationResolver`]
//! and are immutable once shared. Two locations are equal iff their
//! canonical [`Location::path`] strings are equal.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

pub mod bytes;
pub mod file;
pub mod remote;
pub mod resolver;

pub use self::bytes::{BytesLocation, BytesLocationFactory};
pub use file::{FileLocation, FileLocationFactory};
pub use remote::{RemoteLocation, RemoteLocationFactory};
pub use resolver::{LocationFactory, LocationResolver};

/// Descriptor of where data lives
///
/// `Display` is the presentation form and must never include credentials or
/// session tokens. Use [`Location::path`] only when the exact, reconstructible
/// address is needed.
pub trait Location: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Short name of the variant, matched by handle factories
    fn kind(&self) -> &'static str;

    /// Canonical address; resolving it again yields an equal location
    fn path(&self) -> String;

    /// Parsed URI, for URI-based variants
    fn uri(&self) -> Option<Url> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Location {
    /// Borrow the concrete variant, if it is a `T`
    pub fn downcast_ref<T: Location>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Location>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl PartialEq for dyn Location {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for dyn Location {}

impl Hash for dyn Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_equality_by_canonical_path() {
        let a: Arc<dyn Location> = Arc::new(FileLocation::new("/tmp/a.bin"));
        let b: Arc<dyn Location> = Arc::new(FileLocation::new("/tmp/a.bin"));
        let c: Arc<dyn Location> = Arc::new(FileLocation::new("/tmp/c.bin"));

        assert_eq!(&a, &b);
        assert_ne!(&a, &c);

        let set: HashSet<Arc<dyn Location>> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_downcast() {
        let loc: Arc<dyn Location> = Arc::new(BytesLocation::with_capacity(16));
        assert!(loc.is::<BytesLocation>());
        assert!(!loc.is::<FileLocation>());
        assert_eq!(loc.downcast_ref::<BytesLocation>().and_then(|b| b.capacity()), Some(16));
    }
}
