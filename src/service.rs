//! I/O service
//!
//! Owns the configuration and the two registries, and ties them together:
//! raw address → [`Location`] → [`DataHandle`].

use crate::alloc::{AllocationStrategy, DefaultAllocationStrategy};
use crate::config::IoConfig;
use crate::error::Result;
use crate::handle::{AccessMode, BytesHandleFactory, DataHandle, FileHandleFactory, HandleResolver};
use crate::location::{Location, LocationResolver};
use crate::recent::{MemoryPreferences, PreferenceStore, RecentLocations, TomlPreferences};
use std::sync::Arc;
use tracing::{debug, info};

/// Priority of the built-in handle factories
pub const DEFAULT_HANDLE_PRIORITY: i32 = 0;

pub struct IoService {
    config: IoConfig,
    locations: LocationResolver,
    handles: HandleResolver,
    strategy: Arc<dyn AllocationStrategy>,
}

impl IoService {
    /// Service with the default location factories and the bytes and file handles
    pub fn new(config: IoConfig) -> Self {
        let strategy: Arc<dyn AllocationStrategy> =
            Arc::new(DefaultAllocationStrategy::new(config.mapped_buffers));

        let handles = HandleResolver::new();
        handles.register(
            DEFAULT_HANDLE_PRIORITY,
            Arc::new(BytesHandleFactory::new(config.clone())),
        );
        handles.register(
            DEFAULT_HANDLE_PRIORITY,
            Arc::new(FileHandleFactory::new(&config, Arc::clone(&strategy))),
        );

        info!(
            order = %config.default_order,
            mapped = config.mapped_buffers,
            "I/O service initialized"
        );

        Self {
            config,
            locations: LocationResolver::with_defaults(),
            handles,
            strategy,
        }
    }

    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    /// Location registry; register extra factories here
    pub fn locations(&self) -> &LocationResolver {
        &self.locations
    }

    /// Handle registry; register extra factories here
    pub fn handles(&self) -> &HandleResolver {
        &self.handles
    }

    pub fn strategy(&self) -> &Arc<dyn AllocationStrategy> {
        &self.strategy
    }

    pub fn resolve(&self, raw: &str) -> Result<Arc<dyn Location>> {
        self.locations.resolve(raw)
    }

    /// Resolve `raw` and open a handle on it
    pub fn open(&self, raw: &str, mode: AccessMode) -> Result<Box<dyn DataHandle>> {
        let location = self.resolve(raw)?;
        self.open_location(location, mode)
    }

    pub fn open_location(&self, location: Arc<dyn Location>, mode: AccessMode) -> Result<Box<dyn DataHandle>> {
        self.handles.open(location, mode)
    }

    /// The configured preference store: TOML-backed when a path is set
    pub fn preferences(&self) -> Result<Arc<dyn PreferenceStore>> {
        match &self.config.preferences_path {
            Some(path) => {
                debug!(path = %path.display(), "Using file preferences");
                Ok(Arc::new(TomlPreferences::open(path)?))
            }
            None => Ok(Arc::new(MemoryPreferences::new())),
        }
    }

    /// Recent locations loaded from the configured preference store
    pub fn recent(&self) -> Result<RecentLocations> {
        RecentLocations::load(self.preferences()?, &self.locations, self.config.max_recent)
    }
}

impl Default for IoService {
    fn default() -> Self {
        Self::new(IoConfig::default())
    }
}

impl std::fmt::Debug for IoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoService")
            .field("config", &self.config)
            .field("locations", &self.locations.variants())
            .field("handles", &self.handles.factories())
            .finish()
    }
}
