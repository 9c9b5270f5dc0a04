//! Key Index Module
//!
//! Hash map from key to list handle. Pure lookup accelerator: it never looks
//! at list linkage, the engine keeps both structures in step.

use std::collections::HashMap;

use crate::cache::EntryId;

// == Key Index ==
#[derive(Debug, Default)]
pub struct KeyIndex {
    map: HashMap<String, EntryId>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Looks up the handle stored for `key`.
    pub fn get(&self, key: &str) -> Option<EntryId> {
        self.map.get(key).copied()
    }

    /// Inserts or replaces the handle for `key`.
    pub fn insert(&mut self, key: String, id: EntryId) {
        self.map.insert(key, id);
    }

    /// Removes the mapping for `key`; no-op if absent.
    pub fn remove(&mut self, key: &str) -> Option<EntryId> {
        self.map.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
