//! Memory-mapped file reads for image bytes.
//!
//! Large files are mapped instead of copied; the same bytes feed both
//! the content digest used by the cache and the decoder.

use crate::error::HashError;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Minimum file size to use memory-mapped I/O (1MB)
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read file bytes using memory-mapped I/O for large files.
///
/// For files >= 1MB, uses memory mapping which avoids copying
/// data from kernel to user space. For smaller files, uses
/// standard fs::read() which is faster due to lower overhead.
pub fn read_file_bytes(path: &Path) -> Result<FileBytes, HashError> {
    let io_error = |e: std::io::Error| HashError::IoError {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(io_error)?;
    let len = file.metadata().map_err(io_error)?.len();

    if len >= MMAP_THRESHOLD {
        // SAFETY: the mapping is read-only and lives no longer than the
        // returned FileBytes. A concurrent writer can change the bytes we
        // see; the cache digest is computed from this same view.
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_error)?;
        Ok(FileBytes::Mmap(mmap))
    } else {
        let bytes = std::fs::read(path).map_err(io_error)?;
        Ok(FileBytes::Vec(bytes))
    }
}

/// File bytes that may be either owned or memory-mapped.
pub enum FileBytes {
    /// Standard heap-allocated bytes
    Vec(Vec<u8>),
    /// Memory-mapped bytes (zero-copy from disk)
    Mmap(Mmap),
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

impl std::ops::Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn small_files_are_read_into_memory() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"tiny").unwrap();

        let bytes = read_file_bytes(file.path()).unwrap();

        assert!(matches!(bytes, FileBytes::Vec(_)));
        assert_eq!(&*bytes, b"tiny");
    }

    #[test]
    fn large_files_are_mapped() {
        let mut file = NamedTempFile::new().unwrap();
        let payload = vec![7u8; MMAP_THRESHOLD as usize + 10];
        file.write_all(&payload).unwrap();
        file.flush().unwrap();

        let bytes = read_file_bytes(file.path()).unwrap();

        assert!(matches!(bytes, FileBytes::Mmap(_)));
        assert_eq!(bytes.len(), payload.len());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = read_file_bytes(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(HashError::IoError { .. })));
    }

    #[test]
    fn file_bytes_deref() {
        let bytes = FileBytes::Vec(vec![1, 2, 3, 4]);
        assert_eq!(&*bytes, &[1, 2, 3, 4]);
    }
}
