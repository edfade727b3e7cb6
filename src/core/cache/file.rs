//! Single-file cache backend for persistent storage.

use super::format;
use super::{CacheBackend, CacheEntry, InMemoryCache};
use crate::error::CacheError;
use std::ffi::OsString;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// File-backed persistent cache
///
/// The whole table lives in memory between `open` and `flush`. Flushes
/// write a temporary file next to the target and rename it into place,
/// so a crash mid-flush leaves the previous file intact.
pub struct FileCache {
    path: PathBuf,
    entries: InMemoryCache,
    recovered: bool,
}

impl FileCache {
    /// Open or create a cache file at the given path.
    ///
    /// A file that fails validation is moved aside to `<name>.corrupt`
    /// and replaced by an empty cache. Only an unusable location (parent
    /// directory cannot be created, file unreadable or unwritable) is an
    /// error.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let mut cache = match Self::load(path) {
            Ok(Some(entries)) => {
                info!(path = %path.display(), entries = entries.len(), "Loaded hash cache");
                Self {
                    path: path.to_path_buf(),
                    entries: InMemoryCache::from_entries(entries),
                    recovered: false,
                }
            }
            Ok(None) => {
                debug!(path = %path.display(), "Creating new hash cache");
                Self::empty(path, false)
            }
            Err(CacheError::Corrupted { reason, .. }) => {
                warn!(path = %path.display(), %reason, "Hash cache is corrupted, starting empty");
                Self::archive_corrupt(path);
                Self::empty(path, true)
            }
            Err(e) => return Err(e),
        };

        // Make sure a valid file exists and the location is writable
        cache.flush()?;
        Ok(cache)
    }

    /// Read and validate the cache file. `None` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Vec<CacheEntry>>, CacheError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        format::decode(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Corrupted {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether opening found a corrupted file and started over
    pub fn recovered_from_corruption(&self) -> bool {
        self.recovered
    }

    fn empty(path: &Path, recovered: bool) -> Self {
        let mut entries = InMemoryCache::new();
        entries.mark_dirty();
        Self {
            path: path.to_path_buf(),
            entries,
            recovered,
        }
    }

    /// Where a corrupted cache file is moved
    pub fn corrupt_archive_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn archive_corrupt(path: &Path) {
        let archive = Self::corrupt_archive_path(path);
        // Best effort: the next flush overwrites the file either way
        if let Err(e) = fs::rename(path, &archive) {
            warn!(path = %path.display(), error = %e, "Could not archive corrupted hash cache");
        }
    }

    fn write_atomically(&self) -> Result<(), CacheError> {
        let io_error = |e: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source: e,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
        {
            let entries = self.entries.entries();
            let mut writer = BufWriter::new(temp.as_file_mut());
            format::encode(&mut writer, entries.iter()).map_err(io_error)?;
            writer.flush().map_err(io_error)?;
        }
        temp.as_file().sync_all().map_err(io_error)?;

        temp.persist(&self.path)
            .map_err(|e| CacheError::PersistFailed {
                path: self.path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}

impl CacheBackend for FileCache {
    fn get(&self, path: &str) -> Option<CacheEntry> {
        self.entries.get(path)
    }

    fn set(&mut self, entry: CacheEntry) {
        self.entries.set(entry);
    }

    fn remove(&mut self, path: &str) -> Option<CacheEntry> {
        self.entries.remove(path)
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn entries(&self) -> Vec<CacheEntry> {
        self.entries.entries()
    }

    fn prune_orphans(&mut self) -> usize {
        self.entries.prune_orphans()
    }

    fn is_dirty(&self) -> bool {
        self.entries.is_dirty()
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        if !self.entries.is_dirty() {
            return Ok(());
        }

        self.write_atomically()?;
        self.entries.mark_clean();
        debug!(path = %self.path.display(), entries = self.entries.len(), "Flushed hash cache");
        Ok(())
    }
}
