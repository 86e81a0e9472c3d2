//! Configuration for locations and handles
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `LOCUS_`-prefixed environment variables. Nothing here is global; the
//! resulting [`IoConfig`] is handed to the components that need it.
//!
//! ```toml
//! default_order = "little"
//! initial_capacity = 65536
//! mapped_buffers = false
//! max_recent = 10
//! preferences_path = "/home/me/.config/locus/prefs.toml"
//! ```

use crate::error::{Error, Result};
use crate::handle::ByteOrder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Initial length of a new in-memory buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1_000_000;

/// Number of recent locations kept by default.
pub const DEFAULT_MAX_RECENT: usize = 10;

/// Environment variable prefix, e.g. `LOCUS_MAPPED_BUFFERS=true`.
pub const ENV_PREFIX: &str = "LOCUS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Byte order new handles start with
    pub default_order: ByteOrder,
    /// Capacity allocated for a new, empty in-memory handle
    pub initial_capacity: usize,
    /// Serve file ranges through memory maps instead of heap copies
    pub mapped_buffers: bool,
    /// Maximum number of entries in the recent locations list
    pub max_recent: usize,
    /// TOML file backing the preference store, if any
    pub preferences_path: Option<PathBuf>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            default_order: ByteOrder::BigEndian,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            mapped_buffers: false,
            max_recent: DEFAULT_MAX_RECENT,
            preferences_path: None,
        }
    }
}

impl IoConfig {
    /// Load configuration from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let loaded = builder
            .build()
            .and_then(|c| c.try_deserialize::<IoConfig>())
            .map_err(|e| Error::Config(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Defaults overridden by `LOCUS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Parse configuration from a TOML string (no environment layering)
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let parsed: IoConfig = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.max_recent == 0 {
            return Err(Error::Config("max_recent must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.default_order = order;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_mapped_buffers(mut self, mapped: bool) -> Self {
        self.mapped_buffers = mapped;
        self
    }

    pub fn with_max_recent(mut self, max: usize) -> Self {
        self.max_recent = max;
        self
    }

    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }
}
