//! Location resolver - raw address to Location

use super::bytes::BytesLocationFactory;
use super::file::FileLocationFactory;
use super::remote::RemoteLocationFactory;
use super::Location;
use crate::error::{Error, Result};
use crate::registry::PriorityRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// Priority of the built-in remote variant
pub const REMOTE_PRIORITY: i32 = 100;
/// Priority of the built-in `bytes:` variant
pub const BYTES_PRIORITY: i32 = 50;
/// Priority of the built-in file variant; it claims almost anything, so it goes last
pub const FILE_PRIORITY: i32 = 0;

/// Builds one Location variant from raw addresses it understands
pub trait LocationFactory: Send + Sync {
    /// Name used in logs and for unregistering
    fn name(&self) -> &str;

    /// Whether this variant understands `raw`
    ///
    /// A factory that claims an input owns it: if [`create`](Self::create)
    /// then fails, resolution fails instead of trying the next variant.
    fn claims(&self, raw: &str) -> bool;

    fn create(&self, raw: &str) -> Result<Arc<dyn Location>>;
}

/// Ordered registry of location variants
pub struct LocationResolver {
    factories: PriorityRegistry<dyn LocationFactory>,
}

impl LocationResolver {
    /// An empty resolver
    pub fn new() -> Self {
        Self {
            factories: PriorityRegistry::new(),
        }
    }

    /// A resolver with the remote, bytes and file variants registered
    pub fn with_defaults() -> Self {
        let resolver = Self::new();
        resolver.register(REMOTE_PRIORITY, Arc::new(RemoteLocationFactory::new()));
        resolver.register(BYTES_PRIORITY, Arc::new(BytesLocationFactory));
        resolver.register(FILE_PRIORITY, Arc::new(FileLocationFactory));
        resolver
    }

    pub fn register(&self, priority: i32, factory: Arc<dyn LocationFactory>) {
        let name = factory.name().to_string();
        info!(name = %name, priority, "Registering location variant");
        self.factories.register(name, priority, factory);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories.unregister(name)
    }

    /// Resolve a raw address to a Location
    pub fn resolve(&self, raw: &str) -> Result<Arc<dyn Location>> {
        let entry = self
            .factories
            .find(|f| f.claims(raw))
            .ok_or_else(|| Error::Unresolvable(raw.to_string()))?;

        let location = entry.factory.create(raw)?;
        debug!(variant = %entry.name, location = %location, "Resolved location");
        Ok(location)
    }

    /// Variant names in resolution order
    pub fn variants(&self) -> Vec<String> {
        self.factories.names()
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{BytesLocation, FileLocation, RemoteLocation};

    struct Prefix {
        name: &'static str,
        prefix: &'static str,
    }

    impl LocationFactory for Prefix {
        fn name(&self) -> &str {
            self.name
        }

        fn claims(&self, raw: &str) -> bool {
            raw.starts_with(self.prefix)
        }

        fn create(&self, raw: &str) -> Result<Arc<dyn Location>> {
            Ok(Arc::new(FileLocation::new(format!("{}/{}", self.name, raw))))
        }
    }

    #[test]
    fn test_defaults_dispatch() -> Result<()> {
        let resolver = LocationResolver::with_defaults();
        assert_eq!(resolver.variants(), vec!["remote", "bytes", "file"]);

        assert!(resolver.resolve("bytes:")?.is::<BytesLocation>());
        assert!(resolver.resolve("remote://host:1")?.is::<RemoteLocation>());
        assert!(resolver.resolve("/tmp/data.bin")?.is::<FileLocation>());
        Ok(())
    }

    #[test]
    fn test_unresolvable() {
        let resolver = LocationResolver::with_defaults();
        assert!(matches!(resolver.resolve(""), Err(Error::Unresolvable(_))));
        assert!(matches!(
            resolver.resolve("http://example.org/x"),
            Err(Error::Unresolvable(_))
        ));
    }

    #[test]
    fn test_claimed_but_invalid_does_not_fall_through() {
        let resolver = LocationResolver::with_defaults();
        // The file variant would accept this string, but bytes claimed it first
        assert!(matches!(
            resolver.resolve("bytes:capacity=-1"),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_priority_beats_registration_order() -> Result<()> {
        let resolver = LocationResolver::new();
        resolver.register(1, Arc::new(Prefix { name: "low", prefix: "x" }));
        resolver.register(9, Arc::new(Prefix { name: "high", prefix: "x" }));
        resolver.register(9, Arc::new(Prefix { name: "high-later", prefix: "x" }));

        for _ in 0..3 {
            assert_eq!(resolver.resolve("x1")?.path(), "high/x1");
        }
        Ok(())
    }

    #[test]
    fn test_canonical_round_trip() -> Result<()> {
        let resolver = LocationResolver::with_defaults();
        for raw in [
            "bytes:",
            "bytes:capacity=12",
            "/tmp/some file.bin",
            "remote://alice:pw@host:4064/",
            "remote://host/?session=s&encrypted=true",
        ] {
            let first = resolver.resolve(raw)?;
            let second = resolver.resolve(&first.path())?;
            assert_eq!(&first, &second, "round trip of {}", raw);
        }
        Ok(())
    }
}
