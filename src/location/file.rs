//! Local file locations

use super::bytes::BYTES_PREFIX;
use super::resolver::LocationFactory;
use super::Location;
use crate::error::{Error, Result};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Prefix that marks a raw address as a `file://` URI rather than a path
pub const FILE_URI_PREFIX: &str = "file://";

/// A path on the local filesystem
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
}

impl FileLocation {
    pub const KIND: &'static str = "file";

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse a raw address: a plain path, or a `file://` URI
    ///
    /// Only the literal `file://` prefix makes a URI; anything else,
    /// colons included, is taken as a path verbatim.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::invalid_address(raw, "empty path"));
        }
        if raw.starts_with(FILE_URI_PREFIX) {
            let url = Url::parse(raw).map_err(|e| Error::invalid_address(raw, e.to_string()))?;
            let path = url
                .to_file_path()
                .map_err(|_| Error::invalid_address(raw, "not a local file URI"))?;
            return Ok(Self { path });
        }
        Ok(Self::new(raw))
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }
}

impl PartialEq for FileLocation {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl Eq for FileLocation {}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl Location for FileLocation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn uri(&self) -> Option<Url> {
        Url::from_file_path(&self.path).ok()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Claims plain paths and `file://` URIs
///
/// Steps aside only for addresses another variant could own: `scheme://`
/// forms other than `file://`, and `bytes:` addresses. Other colons are
/// ordinary path characters (`notes:v2.txt`, `C:\data`).
#[derive(Debug, Default)]
pub struct FileLocationFactory;

impl LocationFactory for FileLocationFactory {
    fn name(&self) -> &str {
        "file"
    }

    fn claims(&self, raw: &str) -> bool {
        if raw.is_empty() || raw.starts_with(BYTES_PREFIX) {
            return false;
        }
        raw.starts_with(FILE_URI_PREFIX) || !raw.contains("://")
    }

    fn create(&self, raw: &str) -> Result<Arc<dyn Location>> {
        Ok(Arc::new(FileLocation::parse(raw)?))
    }
}
