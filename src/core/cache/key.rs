//! Cache key derivation: path normalization and content digests.

use crate::error::HashError;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use unicode_normalization::UnicodeNormalization;
use xxhash_rust::xxh3::xxh3_128;

/// Normalize a path for use as a cache key.
///
/// The path is canonicalized (absolute, symlinks and `..` resolved) and
/// converted to Unicode NFC, so `café.jpg` typed on macOS (NFD) and on
/// Linux (NFC) map to the same key. Non-UTF-8 components are replaced
/// lossily; the content digest in the key keeps such collisions harmless.
pub fn normalize_path(path: &Path) -> Result<String, HashError> {
    let canonical = std::fs::canonicalize(path).map_err(|e| HashError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(canonical.to_string_lossy().nfc().collect())
}

/// Digest of a file's bytes
pub fn content_digest(bytes: &[u8]) -> u128 {
    xxh3_128(bytes)
}

/// Current time in whole seconds since the Unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_and_absolute_paths_agree() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("photo.png");
        std::fs::write(&file, b"x").unwrap();

        let dotted = dir.path().join(".").join("photo.png");

        assert_eq!(normalize_path(&file).unwrap(), normalize_path(&dotted).unwrap());
    }

    #[test]
    fn nfd_and_nfc_names_normalize_alike() {
        let nfd: String = "cafe\u{0301}".nfc().collect();
        assert_eq!(nfd, "caf\u{e9}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = normalize_path(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(HashError::IoError { .. })));
    }

    #[test]
    fn digest_depends_on_content() {
        assert_eq!(content_digest(b"abc"), content_digest(b"abc"));
        assert_ne!(content_digest(b"abc"), content_digest(b"abd"));
    }
}
