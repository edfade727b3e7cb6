//! Cache backend trait definition.

use super::{CacheEntry, CacheStats};
use crate::error::CacheError;

/// Trait for cache backends
///
/// Backends do no locking of their own: the owning context is the only
/// mutator and every mutation goes through `&mut self`.
pub trait CacheBackend: Send {
    /// Get the entry stored for a normalized path.
    ///
    /// No validation happens here; the caller compares the entry's key
    /// against the file on disk.
    fn get(&self, path: &str) -> Option<CacheEntry>;

    /// Store an entry, replacing any entry for the same path
    fn set(&mut self, entry: CacheEntry);

    /// Remove a specific entry
    fn remove(&mut self, path: &str) -> Option<CacheEntry>;

    /// Clear all cached entries
    fn clear(&mut self);

    /// Snapshot of every entry, ordered by path
    fn entries(&self) -> Vec<CacheEntry>;

    /// Get cache statistics
    fn stats(&self) -> CacheStats {
        CacheStats::from_entries(&self.entries())
    }

    /// Remove entries for files that no longer exist
    ///
    /// Returns the number of entries removed.
    fn prune_orphans(&mut self) -> usize;

    /// Whether there are changes not yet written out
    fn is_dirty(&self) -> bool;

    /// Persist pending changes
    fn flush(&mut self) -> Result<(), CacheError>;
}
