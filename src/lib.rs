// Locus IO - Rust Implementation
// Uniform typed random-access I/O over pluggable data locations

#![warn(rust_2018_idioms)]

pub mod alloc;
pub mod config;
pub mod handle;
pub mod location;
pub mod recent;
pub mod registry;
pub mod service;

// Re-exports for convenience
pub use alloc::{AllocationStrategy, DefaultAllocationStrategy, MapMode, Region};
pub use config::IoConfig;
pub use handle::{AccessMode, ByteOrder, BytesHandle, DataHandle, FileHandle, HandleResolver};
pub use location::{
    BytesLocation, FileLocation, Location, LocationResolver, RemoteLocation,
};
pub use recent::{MemoryPreferences, PreferenceStore, RecentLocations, TomlPreferences};
pub use service::IoService;

/// Locus IO error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Unresolvable address: {0}")]
        Unresolvable(String),

        #[error("Invalid address '{address}': {reason}")]
        InvalidAddress { address: String, reason: String },

        #[error("Unsupported location type: {0}")]
        UnsupportedLocationType(String),

        #[error("End of stream: needed {needed} bytes, {available} available")]
        EndOfStream { needed: u64, available: u64 },

        #[error("Offset {pos} out of range (length {length})")]
        OutOfRange { pos: u64, length: u64 },

        #[error("Handle is read-only")]
        ReadOnlyViolation,

        #[error("Handle is closed")]
        Closed,

        #[error("Allocation failure: {0}")]
        AllocationFailure(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Preferences error: {0}")]
        Preferences(String),

        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }

    impl Error {
        pub(crate) fn invalid_address(address: &str, reason: impl Into<String>) -> Self {
            Error::InvalidAddress {
                address: address.to_string(),
                reason: reason.into(),
            }
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
