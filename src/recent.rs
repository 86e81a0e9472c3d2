//! Recently used locations
//!
//! An ordered list of locations, oldest first, capped at a maximum size.
//! Every change is written through a [`PreferenceStore`] as canonical
//! address strings and read back through the [`LocationResolver`].

use crate::error::{Error, Result};
use crate::location::{Location, LocationResolver};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Preference key holding the recent list
pub const RECENT_LOCATIONS_KEY: &str = "recent";

/// Ordered string-list persistence
pub trait PreferenceStore: Send + Sync {
    /// The list stored under `key`, empty if absent
    fn get_list(&self, key: &str) -> Result<Vec<String>>;

    fn put_list(&self, key: &str, values: &[String]) -> Result<()>;

    fn clear(&self, key: &str) -> Result<()>;
}

/// Process-local preferences, lost on exit
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    lists: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.lists.read().get(key).cloned().unwrap_or_default())
    }

    fn put_list(&self, key: &str, values: &[String]) -> Result<()> {
        self.lists.write().insert(key.to_string(), values.to_vec());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.lists.write().remove(key);
        Ok(())
    }
}

/// Preferences persisted as a TOML table of string arrays
///
/// ```toml
/// recent = ["/data/a.tif", "bytes:capacity=64"]
/// ```
#[derive(Debug)]
pub struct TomlPreferences {
    path: PathBuf,
    lists: Mutex<BTreeMap<String, Vec<String>>>,
}

impl TomlPreferences {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lists = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|e| {
                Error::Preferences(format!("failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            lists: Mutex::new(lists),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, lists: &BTreeMap<String, Vec<String>>) -> Result<()> {
        let text = toml::to_string(lists)
            .map_err(|e| Error::Preferences(format!("failed to serialize preferences: {}", e)))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}

impl PreferenceStore for TomlPreferences {
    fn get_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.lists.lock().get(key).cloned().unwrap_or_default())
    }

    fn put_list(&self, key: &str, values: &[String]) -> Result<()> {
        let mut lists = self.lists.lock();
        lists.insert(key.to_string(), values.to_vec());
        self.persist(&lists)
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut lists = self.lists.lock();
        lists.remove(key);
        self.persist(&lists)
    }
}

/// Most-recently-used locations, most recent last
pub struct RecentLocations {
    store: Arc<dyn PreferenceStore>,
    max: usize,
    locations: Vec<Arc<dyn Location>>,
}

impl RecentLocations {
    /// Load the stored list, skipping entries that no longer resolve
    pub fn load(store: Arc<dyn PreferenceStore>, resolver: &LocationResolver, max: usize) -> Result<Self> {
        if max == 0 {
            return Err(Error::InvalidArgument("recent list size must be at least 1".to_string()));
        }

        let mut locations = Vec::new();
        for path in store.get_list(RECENT_LOCATIONS_KEY)? {
            match resolver.resolve(&path) {
                Ok(location) => locations.push(location),
                Err(e) => warn!(error = %e, "Dropping unresolvable recent location"),
            }
        }
        let overflow = locations.len().saturating_sub(max);
        locations.drain(..overflow);

        Ok(Self {
            store,
            max,
            locations,
        })
    }

    /// Record a use of `location`, moving it to the end if already present
    pub fn add(&mut self, location: Arc<dyn Location>) -> Result<()> {
        self.locations.retain(|l| l != &location);
        self.locations.push(location);
        let overflow = self.locations.len().saturating_sub(self.max);
        self.locations.drain(..overflow);
        self.save()
    }

    /// Forget `location`; returns whether it was present
    pub fn remove(&mut self, location: &dyn Location) -> Result<bool> {
        let before = self.locations.len();
        self.locations.retain(|l| **l != *location);
        let removed = self.locations.len() != before;
        self.save()?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.locations.clear();
        self.store.clear(RECENT_LOCATIONS_KEY)
    }

    pub fn locations(&self) -> &[Arc<dyn Location>] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    fn save(&self) -> Result<()> {
        let paths: Vec<String> = self.locations.iter().map(|l| l.path()).collect();
        self.store.put_list(RECENT_LOCATIONS_KEY, &paths)
    }
}

impl std::fmt::Debug for RecentLocations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display form only; canonical paths may carry secrets
        let shown: Vec<String> = self.locations.iter().map(|l| l.to_string()).collect();
        f.debug_struct("RecentLocations")
            .field("max", &self.max)
            .field("locations", &shown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FileLocation;

    fn file(path: &str) -> Arc<dyn Location> {
        Arc::new(FileLocation::new(path))
    }

    #[test]
    fn test_add_moves_to_end_and_caps() -> Result<()> {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferences::new());
        let resolver = LocationResolver::with_defaults();
        let mut recent = RecentLocations::load(Arc::clone(&store), &resolver, 3)?;

        recent.add(file("/a"))?;
        recent.add(file("/b"))?;
        recent.add(file("/a"))?;
        let paths: Vec<String> = recent.locations().iter().map(|l| l.path()).collect();
        assert_eq!(paths, vec!["/b", "/a"]);

        recent.add(file("/c"))?;
        recent.add(file("/d"))?;
        let paths: Vec<String> = recent.locations().iter().map(|l| l.path()).collect();
        assert_eq!(paths, vec!["/a", "/c", "/d"]);
        assert_eq!(store.get_list(RECENT_LOCATIONS_KEY)?, paths);
        Ok(())
    }

    #[test]
    fn test_remove_and_clear() -> Result<()> {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferences::new());
        let resolver = LocationResolver::with_defaults();
        let mut recent = RecentLocations::load(Arc::clone(&store), &resolver, 5)?;

        recent.add(file("/a"))?;
        recent.add(file("/b"))?;
        assert!(recent.remove(file("/a").as_ref())?);
        assert!(!recent.remove(file("/zzz").as_ref())?);
        assert_eq!(store.get_list(RECENT_LOCATIONS_KEY)?, vec!["/b".to_string()]);

        recent.clear()?;
        assert!(recent.is_empty());
        assert!(store.get_list(RECENT_LOCATIONS_KEY)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_skips_unresolvable() -> Result<()> {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferences::new());
        store.put_list(
            RECENT_LOCATIONS_KEY,
            &["/ok".to_string(), "http://nobody/claims/this".to_string(), "bytes:capacity=8".to_string()],
        )?;
        let recent = RecentLocations::load(store, &LocationResolver::with_defaults(), 10)?;
        assert_eq!(recent.len(), 2);
        Ok(())
    }

    #[test]
    fn test_toml_store_persists() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("prefs.toml");
        {
            let store = TomlPreferences::open(&path)?;
            store.put_list(RECENT_LOCATIONS_KEY, &["/x".to_string(), "/y".to_string()])?;
        }
        let reopened = TomlPreferences::open(&path)?;
        assert_eq!(
            reopened.get_list(RECENT_LOCATIONS_KEY)?,
            vec!["/x".to_string(), "/y".to_string()]
        );
        reopened.clear(RECENT_LOCATIONS_KEY)?;
        assert!(TomlPreferences::open(&path)?.get_list(RECENT_LOCATIONS_KEY)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_debug_hides_secrets() -> Result<()> {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferences::new());
        let resolver = LocationResolver::with_defaults();
        let mut recent = RecentLocations::load(store, &resolver, 2)?;
        recent.add(resolver.resolve("remote://host/?session=topsecret")?)?;
        assert!(!format!("{:?}", recent).contains("topsecret"));
        Ok(())
    }
}
