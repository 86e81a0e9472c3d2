//! Handle resolver - Location to DataHandle

use super::{AccessMode, DataHandle};
use crate::error::{Error, Result};
use crate::location::Location;
use crate::registry::PriorityRegistry;
use std::sync::Arc;
use tracing::{debug, info};

/// Opens one kind of DataHandle on the location kind it supports
pub trait HandleFactory: Send + Sync {
    fn name(&self) -> &str;

    /// [`Location::kind`] this factory binds to
    fn location_kind(&self) -> &'static str;

    fn supports(&self, location: &dyn Location) -> bool {
        location.kind() == self.location_kind()
    }

    /// Open a handle; fails with `UnsupportedLocationType` for foreign locations
    fn open(&self, location: Arc<dyn Location>, mode: AccessMode) -> Result<Box<dyn DataHandle>>;
}

/// Ordered registry of handle factories
pub struct HandleResolver {
    factories: PriorityRegistry<dyn HandleFactory>,
}

impl HandleResolver {
    pub fn new() -> Self {
        Self {
            factories: PriorityRegistry::new(),
        }
    }

    pub fn register(&self, priority: i32, factory: Arc<dyn HandleFactory>) {
        let name = factory.name().to_string();
        info!(name = %name, priority, kind = factory.location_kind(), "Registering handle factory");
        self.factories.register(name, priority, factory);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories.unregister(name)
    }

    /// Whether some registered factory can open `location`
    pub fn supports(&self, location: &dyn Location) -> bool {
        self.factories.find(|f| f.supports(location)).is_some()
    }

    /// Open the highest-priority handle supporting `location`
    pub fn open(&self, location: Arc<dyn Location>, mode: AccessMode) -> Result<Box<dyn DataHandle>> {
        let entry = self
            .factories
            .find(|f| f.supports(location.as_ref()))
            .ok_or_else(|| Error::UnsupportedLocationType(location.kind().to_string()))?;

        debug!(factory = %entry.name, location = %location, mode = %mode, "Opening handle");
        entry.factory.open(location, mode)
    }

    /// Factory names in resolution order
    pub fn factories(&self) -> Vec<String> {
        self.factories.names()
    }
}

impl Default for HandleResolver {
    fn default() -> Self {
        Self::new()
    }
}
