//! # Cache Module
//!
//! Persists perceptual hashes to avoid recomputation.
//!
//! ## Benefits
//! - Repeated requests for an unchanged image skip decoding entirely
//! - Only new or modified images need hashing
//! - Variants are filled in lazily: an entry may hold any subset of
//!   aHash, dHash and pHash
//!
//! ## Invalidation
//! Entries are keyed by normalized path and carry the file's size,
//! modification time and an xxh3-128 digest of its bytes. A matching
//! size and mtime is trusted unless the stamp is "racy" (the file was
//! modified within `racy_window_secs` of when the stamp was captured);
//! anything else is settled by comparing content digests.
//!
//! ## Backends
//! - `FileCache` - Persistent single-file storage
//! - `InMemoryCache` - For testing and throwaway contexts

mod file;
pub mod format;
pub mod key;
mod memory;
mod traits;

pub use file::FileCache;
pub use key::{content_digest, normalize_path, unix_now};
pub use memory::InMemoryCache;
pub use traits::CacheBackend;

use crate::core::hasher::HashAlgorithmKind;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size and modification time of a file when it was looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileStamp {
    /// File size in bytes
    pub size: u64,
    /// Whole seconds of the modification time since the Unix epoch
    pub modified_secs: u64,
    /// Sub-second part of the modification time
    pub modified_nanos: u32,
}

impl FileStamp {
    /// Capture a stamp from file metadata
    pub fn from_metadata(metadata: &Metadata) -> std::io::Result<Self> {
        let modified = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);

        Ok(Self {
            size: metadata.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        })
    }
}

/// Identity of an image's content at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Canonical, NFC-normalized path
    pub path: String,
    /// Size and mtime when the digest was taken
    pub stamp: FileStamp,
    /// xxh3-128 of the file bytes
    pub digest: u128,
    /// When stamp and digest were captured (epoch seconds)
    pub captured_at: u64,
}

impl CacheKey {
    /// Whether the stamp alone cannot prove the content is unchanged.
    ///
    /// A file modified in the same clock window as the capture may have
    /// been rewritten again afterwards without its mtime moving.
    pub fn is_racy(&self, window_secs: u64) -> bool {
        self.stamp.modified_secs.saturating_add(window_secs) >= self.captured_at
    }
}

/// The three hash variants for one image; absent ones were never requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashTriple {
    pub ahash: Option<u64>,
    pub dhash: Option<u64>,
    pub phash: Option<u64>,
    /// Epoch seconds of the most recent computation
    pub computed_at: u64,
}

impl HashTriple {
    /// Stored value for `kind`
    pub fn get(&self, kind: HashAlgorithmKind) -> Option<u64> {
        match kind {
            HashAlgorithmKind::Average => self.ahash,
            HashAlgorithmKind::Difference => self.dhash,
            HashAlgorithmKind::Perceptual => self.phash,
        }
    }

    /// Store the value for `kind`
    pub fn set(&mut self, kind: HashAlgorithmKind, value: u64) {
        let slot = match kind {
            HashAlgorithmKind::Average => &mut self.ahash,
            HashAlgorithmKind::Difference => &mut self.dhash,
            HashAlgorithmKind::Perceptual => &mut self.phash,
        };
        *slot = Some(value);
    }

    /// Kinds among `wanted` that have no value yet
    pub fn missing(&self, wanted: &[HashAlgorithmKind]) -> Vec<HashAlgorithmKind> {
        wanted
            .iter()
            .copied()
            .filter(|&kind| self.get(kind).is_none())
            .collect()
    }
}

/// A cached hash entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub hashes: HashTriple,
}

impl CacheEntry {
    /// Check if this entry can be served for a file on its stamp alone
    pub fn is_valid_for(&self, stamp: &FileStamp, racy_window_secs: u64) -> bool {
        self.key.stamp == *stamp && !self.key.is_racy(racy_window_secs)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Entries holding each variant
    pub ahash_count: usize,
    pub dhash_count: usize,
    pub phash_count: usize,
    /// Oldest computation timestamp
    pub oldest_entry: Option<SystemTime>,
    /// Newest computation timestamp
    pub newest_entry: Option<SystemTime>,
}

impl CacheStats {
    /// Summarize a set of entries
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CacheEntry>) -> Self {
        let mut stats = CacheStats::default();
        for entry in entries {
            stats.total_entries += 1;
            stats.ahash_count += entry.hashes.ahash.is_some() as usize;
            stats.dhash_count += entry.hashes.dhash.is_some() as usize;
            stats.phash_count += entry.hashes.phash.is_some() as usize;

            let at = UNIX_EPOCH + Duration::from_secs(entry.hashes.computed_at);
            stats.oldest_entry = Some(stats.oldest_entry.map_or(at, |t| t.min(at)));
            stats.newest_entry = Some(stats.newest_entry.map_or(at, |t| t.max(at)));
        }
        stats
    }
}
