//! # Context Module
//!
//! A hashing session bound to one cache.
//!
//! Every hash request goes through the context: it derives the cache key,
//! decides whether the stored entry can be trusted, and only decodes the
//! image when some requested variant is missing.
//!
//! ## Request flow
//! 1. Normalize the path and stat the file
//! 2. If the stamp matches a non-racy entry (metadata strategy), serve it
//! 3. Otherwise read and digest the bytes; a matching digest refreshes the
//!    entry's key, a different digest discards it
//! 4. Decode once and compute whatever variants are still missing
//!
//! Failures are returned to the caller and never stored.

mod config;

pub use config::{ContextConfig, KeyStrategy, DEFAULT_RACY_WINDOW_SECS};

use crate::core::cache::{
    content_digest, normalize_path, unix_now, CacheBackend, CacheEntry, CacheKey, CacheStats,
    FileCache, FileStamp, HashTriple, InMemoryCache,
};
use crate::core::hasher::{mmap_decode, FastDecoder, HashAlgorithmKind, HasherSet};
use crate::error::{CacheError, HashError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counters for the requests served by one context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    /// Served from the cache on the strength of the file stamp
    pub hits: u64,
    /// Needed at least one variant computed
    pub misses: u64,
    /// Served from the cache after the content digest confirmed the entry
    pub revalidations: u64,
    /// Images decoded
    pub decodes: u64,
}

/// A hashing session owning one cache
pub struct Context {
    cache: Box<dyn CacheBackend>,
    cache_path: Option<PathBuf>,
    config: ContextConfig,
    hashers: HasherSet,
    stats: ContextStats,
}

impl Context {
    /// Open a context on a cache file with the default configuration
    pub fn open(cache_path: &Path) -> Result<Self> {
        Self::open_with_config(cache_path, ContextConfig::default())
    }

    /// Open a context on a cache file.
    ///
    /// A missing file is created along with its parent directories. A
    /// corrupted file is set aside and replaced by an empty cache.
    pub fn open_with_config(cache_path: &Path, config: ContextConfig) -> Result<Self> {
        let cache = FileCache::open(cache_path)?;
        info!(
            cache = %cache_path.display(),
            strategy = ?config.strategy(),
            "Opened hashing context"
        );
        Ok(Self::with_backend(
            Box::new(cache),
            Some(cache_path.to_path_buf()),
            config,
        ))
    }

    /// A context whose cache lives only as long as it does
    pub fn in_memory(config: ContextConfig) -> Self {
        Self::with_backend(Box::new(InMemoryCache::new()), None, config)
    }

    /// A context over any cache backend
    pub fn with_backend(
        cache: Box<dyn CacheBackend>,
        cache_path: Option<PathBuf>,
        config: ContextConfig,
    ) -> Self {
        Self {
            cache,
            cache_path,
            config,
            hashers: HasherSet::new(),
            stats: ContextStats::default(),
        }
    }

    /// Compute or fetch one hash variant for an image
    pub fn get_hash(&mut self, path: &Path, kind: HashAlgorithmKind) -> Result<u64> {
        let hashes = self.request(path, &[kind])?;
        hashes.get(kind).ok_or_else(|| {
            HashError::ComputationFailed(format!("{} missing after computation", kind)).into()
        })
    }

    /// Compute or fetch all three variants with at most one decode
    pub fn get_hashes(&mut self, path: &Path) -> Result<HashTriple> {
        self.request(path, &HashAlgorithmKind::ALL)
    }

    /// What the cache holds for a path, without checking the file
    pub fn cached_hashes(&self, path: &Path) -> Result<Option<HashTriple>> {
        let key_path = normalize_path(path)?;
        Ok(self.cache.get(&key_path).map(|entry| entry.hashes))
    }

    /// Write pending entries to the cache file
    pub fn flush(&mut self) -> std::result::Result<(), CacheError> {
        self.cache.flush()
    }

    /// Flush and release the context
    pub fn close(mut self) -> std::result::Result<(), CacheError> {
        self.cache.flush()
    }

    /// Request counters since the context was opened
    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    /// Summary of the cache contents
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop entries for files that no longer exist
    pub fn prune_orphans(&mut self) -> usize {
        let removed = self.cache.prune_orphans();
        if removed > 0 {
            info!(removed, "Pruned orphaned cache entries");
        }
        removed
    }

    /// Forget every cached hash
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Location of the cache file, if persistent
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Active configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    fn request(&mut self, path: &Path, wanted: &[HashAlgorithmKind]) -> Result<HashTriple> {
        let key_path = normalize_path(path)?;
        let stamp = std::fs::metadata(path)
            .and_then(|metadata| FileStamp::from_metadata(&metadata))
            .map_err(|e| HashError::IoError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let existing = self.cache.get(&key_path);

        if let Some(entry) = &existing {
            if self.stamp_is_trusted(entry, &stamp) && entry.hashes.missing(wanted).is_empty() {
                debug!(path = %key_path, "Cache hit");
                self.stats.hits += 1;
                return Ok(entry.hashes);
            }
        }

        let bytes = mmap_decode::read_file_bytes(path)?;
        let now = unix_now();
        let key = CacheKey {
            path: key_path,
            stamp,
            digest: content_digest(&bytes),
            captured_at: now,
        };

        let (mut hashes, refreshed) = match existing {
            Some(entry) if entry.key.digest == key.digest => {
                let refreshed = entry.key.stamp != key.stamp
                    || entry.key.is_racy(self.config.racy_window());
                (entry.hashes, refreshed)
            }
            Some(_) => {
                debug!(path = %key.path, "Content changed, discarding cached hashes");
                self.cache.remove(&key.path);
                (HashTriple::default(), true)
            }
            None => (HashTriple::default(), true),
        };

        let missing = hashes.missing(wanted);
        if missing.is_empty() {
            debug!(path = %key.path, "Cache entry revalidated by digest");
            if refreshed {
                self.stats.revalidations += 1;
                self.cache.set(CacheEntry { key, hashes });
            } else {
                self.stats.hits += 1;
            }
            return Ok(hashes);
        }

        debug!(path = %key.path, missing = ?missing, "Cache miss");
        self.stats.misses += 1;

        let image = FastDecoder::decode_bytes(path, &bytes)?;
        self.stats.decodes += 1;
        drop(bytes);

        for hash in self.hashers.hash_image_many(&image, &missing, path)? {
            hashes.set(hash.algorithm(), hash.value());
        }
        hashes.computed_at = now;

        self.cache.set(CacheEntry { key, hashes });
        Ok(hashes)
    }

    fn stamp_is_trusted(&self, entry: &CacheEntry, stamp: &FileStamp) -> bool {
        self.config.strategy() == KeyStrategy::Metadata
            && entry.is_valid_for(stamp, self.config.racy_window())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.cache.is_dirty() {
            return;
        }
        if let Err(e) = self.cache.flush() {
            warn!(error = %e, "Failed to flush hash cache on drop");
        }
    }
}
