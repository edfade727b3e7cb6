//! In-memory cache backend.

use super::{CacheBackend, CacheEntry};
use crate::error::CacheError;
use std::collections::HashMap;
use std::path::Path;

/// In-memory cache backend
///
/// Useful for testing and scenarios where persistence isn't needed.
/// `FileCache` keeps its working set in one of these.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: HashMap<String, CacheEntry>,
    dirty: bool,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clean cache from loaded entries
    pub(crate) fn from_entries(entries: impl IntoIterator<Item = CacheEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.path.clone(), entry))
                .collect(),
            dirty: false,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl CacheBackend for InMemoryCache {
    fn get(&self, path: &str) -> Option<CacheEntry> {
        self.entries.get(path).cloned()
    }

    fn set(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key.path.clone(), entry);
        self.dirty = true;
    }

    fn remove(&mut self, path: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
    }

    fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.key.path.cmp(&b.key.path));
        entries
    }

    fn prune_orphans(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| Path::new(path).exists());
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        // Nothing to write; pending changes are discarded with the cache
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::tests::create_entry;

    #[test]
    fn cache_miss_returns_none() {
        let cache = InMemoryCache::new();
        assert!(cache.get("/nonexistent.jpg").is_none());
    }

    #[test]
    fn cache_hit_returns_entry() {
        let mut cache = InMemoryCache::new();
        cache.set(create_entry("/test.jpg"));

        let result = cache.get("/test.jpg").unwrap();

        assert_eq!(result.hashes.ahash, Some(0xFF));
        assert!(cache.is_dirty());
    }

    #[test]
    fn loaded_entries_start_clean() {
        let cache = InMemoryCache::from_entries([create_entry("/a.jpg"), create_entry("/b.jpg")]);

        assert_eq!(cache.len(), 2);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn clear_removes_all_entries() {
        let mut cache = InMemoryCache::new();
        cache.set(create_entry("/a.jpg"));
        cache.set(create_entry("/b.jpg"));

        cache.clear();

        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn entries_are_sorted_by_path() {
        let mut cache = InMemoryCache::new();
        cache.set(create_entry("/b.jpg"));
        cache.set(create_entry("/a.jpg"));

        let paths: Vec<String> = cache.entries().into_iter().map(|e| e.key.path).collect();

        assert_eq!(paths, vec!["/a.jpg", "/b.jpg"]);
    }

    #[test]
    fn remove_deletes_specific_entry() {
        let mut cache = InMemoryCache::new();
        cache.set(create_entry("/test.jpg"));
        cache.flush().unwrap();

        assert!(cache.remove("/test.jpg").is_some());
        assert!(cache.get("/test.jpg").is_none());
        assert!(cache.is_dirty());
    }

    #[test]
    fn prune_drops_missing_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("present.jpg");
        std::fs::write(&present, b"x").unwrap();

        let mut cache = InMemoryCache::new();
        cache.set(create_entry(&present.to_string_lossy()));
        cache.set(create_entry("/gone/away.jpg"));

        assert_eq!(cache.prune_orphans(), 1);
        assert_eq!(cache.stats().total_entries, 1);
    }
}
