//! Specialized collection types

use crate::core::ScenePath;
use std::collections::BTreeMap;

pub use slotmap::{DefaultKey, SlotMap};

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

/// Handle type for stable references
pub type Handle = DefaultKey;

/// Slot map whose entries are also addressable by scene path
///
/// Handles stay valid until the entry is removed; re-inserting a path yields
/// a fresh handle.
#[derive(Debug)]
pub struct PathMap<T> {
    items: HandleMap<(ScenePath, T)>,
    by_path: BTreeMap<ScenePath, Handle>,
}

impl<T> PathMap<T> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            items: HandleMap::new(),
            by_path: BTreeMap::new(),
        }
    }

    /// Insert or replace the entry at `path`
    pub fn insert(&mut self, path: ScenePath, item: T) -> Handle {
        if let Some(&handle) = self.by_path.get(&path) {
            if let Some(slot) = self.items.get_mut(handle) {
                slot.1 = item;
                return handle;
            }
        }
        let handle = self.items.insert((path.clone(), item));
        self.by_path.insert(path, handle);
        handle
    }

    /// Remove the entry at `path`
    pub fn remove(&mut self, path: &ScenePath) -> Option<T> {
        let handle = self.by_path.remove(path)?;
        self.items.remove(handle).map(|(_, item)| item)
    }

    /// Look up by path
    pub fn get(&self, path: &ScenePath) -> Option<&T> {
        self.by_path
            .get(path)
            .and_then(|&handle| self.items.get(handle))
            .map(|(_, item)| item)
    }

    /// Mutable look up by path
    pub fn get_mut(&mut self, path: &ScenePath) -> Option<&mut T> {
        let handle = *self.by_path.get(path)?;
        self.items.get_mut(handle).map(|(_, item)| item)
    }

    /// Look up by handle
    pub fn get_by_handle(&self, handle: Handle) -> Option<(&ScenePath, &T)> {
        self.items.get(handle).map(|(path, item)| (path, item))
    }

    /// Handle of the entry at `path`
    pub fn handle(&self, path: &ScenePath) -> Option<Handle> {
        self.by_path.get(path).copied()
    }

    /// Whether an entry exists at `path`
    pub fn contains(&self, path: &ScenePath) -> bool {
        self.by_path.contains_key(path)
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&ScenePath, &T)> {
        self.by_path
            .values()
            .filter_map(|&handle| self.items.get(handle))
            .map(|(path, item)| (path, item))
    }

    /// Paths in order
    pub fn paths(&self) -> impl Iterator<Item = &ScenePath> {
        self.by_path.keys()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

impl<T> Default for PathMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = PathMap::new();
        let path: ScenePath = "/World/ball".parse().unwrap();
        let first = map.insert(path.clone(), 1);
        let second = map.insert(path.clone(), 2);
        assert_eq!(first, second);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&path), Some(&2));
    }

    #[test]
    fn test_remove_invalidates_handle() {
        let mut map = PathMap::new();
        let path: ScenePath = "/a".parse().unwrap();
        let handle = map.insert(path.clone(), "a");
        assert_eq!(map.remove(&path), Some("a"));
        assert!(map.get_by_handle(handle).is_none());
        assert!(map.is_empty());
    }
}
