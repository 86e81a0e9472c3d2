//! Priority registry - ordered factories for capability matching
//!
//! Entries are scanned highest priority first; entries sharing a priority
//! keep their registration order. Both resolvers are thin wrappers over this.

use parking_lot::RwLock;
use std::sync::Arc;

/// One registered factory
pub struct Entry<T: ?Sized> {
    pub name: String,
    pub priority: i32,
    pub factory: Arc<T>,
}

impl<T: ?Sized> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            priority: self.priority,
            factory: Arc::clone(&self.factory),
        }
    }
}

pub struct PriorityRegistry<T: ?Sized> {
    entries: RwLock<Vec<Entry<T>>>,
}

impl<T: ?Sized> PriorityRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a factory at the given priority
    pub fn register(&self, name: impl Into<String>, priority: i32, factory: Arc<T>) {
        let mut entries = self.entries.write();
        entries.push(Entry {
            name: name.into(),
            priority,
            factory,
        });
        // Stable sort keeps registration order within a priority tier
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Remove every entry registered under `name`
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.name != name);
        entries.len() != before
    }

    /// First entry, in scan order, accepted by `predicate`
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<Entry<T>> {
        self.entries
            .read()
            .iter()
            .find(|e| predicate(e.factory.as_ref()))
            .cloned()
    }

    /// Entry names in scan order
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: ?Sized> Default for PriorityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
