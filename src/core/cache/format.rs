//! Binary cache file format.
//!
//! All integers are little-endian.
//!
//! ```text
//! header:  magic "PIHC", format_version u32
//! entries: count u32
//!   repeated: key_len u32, key_bytes[key_len],
//!             ahash_present u8 [+ ahash u64],
//!             dhash_present u8 [+ dhash u64],
//!             phash_present u8 [+ phash u64],
//!             computed_at u64
//! key_bytes: path_len u32, path (UTF-8), size u64, modified_secs u64,
//!            modified_nanos u32, digest u128, captured_at u64
//! ```
//!
//! Decoding is strict: anything unexpected (wrong magic or version,
//! truncation, a presence flag other than 0/1, a malformed key, trailing
//! bytes) rejects the whole file.

use super::{CacheEntry, CacheKey, FileStamp, HashTriple};
use std::io::{self, Write};
use thiserror::Error;

/// File magic
pub const MAGIC: [u8; 4] = *b"PIHC";

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

/// Why a cache file was rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    #[error("truncated at byte {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid presence flag {flag} at byte {offset}")]
    InvalidFlag { offset: usize, flag: u8 },

    #[error("malformed key: {0}")]
    InvalidKey(String),

    #[error("{0} trailing bytes after the last entry")]
    TrailingBytes(usize),
}

/// Write a complete cache file
pub fn encode<'a, W: Write>(
    writer: &mut W,
    entries: impl ExactSizeIterator<Item = &'a CacheEntry>,
) -> io::Result<()> {
    let count = u32::try_from(entries.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many cache entries"))?;

    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&count.to_le_bytes())?;

    for entry in entries {
        let key = encode_key(&entry.key)?;
        writer.write_all(&(key.len() as u32).to_le_bytes())?;
        writer.write_all(&key)?;

        for value in [entry.hashes.ahash, entry.hashes.dhash, entry.hashes.phash] {
            match value {
                Some(hash) => {
                    writer.write_all(&[1])?;
                    writer.write_all(&hash.to_le_bytes())?;
                }
                None => writer.write_all(&[0])?,
            }
        }

        writer.write_all(&entry.hashes.computed_at.to_le_bytes())?;
    }

    Ok(())
}

/// Parse a complete cache file
pub fn decode(bytes: &[u8]) -> Result<Vec<CacheEntry>, FormatError> {
    let mut reader = Reader::new(bytes);

    if reader.take(MAGIC.len())? != MAGIC {
        return Err(FormatError::BadMagic);
    }

    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }

    let count = reader.u32()? as usize;
    // Don't trust count for allocation; truncation is caught while reading
    let mut entries = Vec::with_capacity(count.min(4096));

    for _ in 0..count {
        let key_len = reader.u32()? as usize;
        let key = decode_key(reader.take(key_len)?)?;

        let ahash = reader.optional_u64()?;
        let dhash = reader.optional_u64()?;
        let phash = reader.optional_u64()?;
        let computed_at = reader.u64()?;

        entries.push(CacheEntry {
            key,
            hashes: HashTriple {
                ahash,
                dhash,
                phash,
                computed_at,
            },
        });
    }

    match reader.remaining() {
        0 => Ok(entries),
        n => Err(FormatError::TrailingBytes(n)),
    }
}

fn encode_key(key: &CacheKey) -> io::Result<Vec<u8>> {
    let path = key.path.as_bytes();
    let path_len = u32::try_from(path.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "cache key path too long"))?;

    let mut bytes = Vec::with_capacity(4 + path.len() + 8 + 8 + 4 + 16 + 8);
    bytes.extend_from_slice(&path_len.to_le_bytes());
    bytes.extend_from_slice(path);
    bytes.extend_from_slice(&key.stamp.size.to_le_bytes());
    bytes.extend_from_slice(&key.stamp.modified_secs.to_le_bytes());
    bytes.extend_from_slice(&key.stamp.modified_nanos.to_le_bytes());
    bytes.extend_from_slice(&key.digest.to_le_bytes());
    bytes.extend_from_slice(&key.captured_at.to_le_bytes());
    Ok(bytes)
}

fn decode_key(bytes: &[u8]) -> Result<CacheKey, FormatError> {
    let invalid = |e: FormatError| FormatError::InvalidKey(e.to_string());
    let mut reader = Reader::new(bytes);

    let path_len = reader.u32().map_err(invalid)? as usize;
    let path = std::str::from_utf8(reader.take(path_len).map_err(invalid)?)
        .map_err(|e| FormatError::InvalidKey(format!("path is not UTF-8: {}", e)))?
        .to_string();

    let size = reader.u64().map_err(invalid)?;
    let modified_secs = reader.u64().map_err(invalid)?;
    let modified_nanos = reader.u32().map_err(invalid)?;
    if modified_nanos >= 1_000_000_000 {
        return Err(FormatError::InvalidKey(format!(
            "nanoseconds out of range: {}",
            modified_nanos
        )));
    }
    let digest = u128::from_le_bytes(reader.array().map_err(invalid)?);
    let captured_at = reader.u64().map_err(invalid)?;

    if reader.remaining() != 0 {
        return Err(FormatError::InvalidKey(format!(
            "{} unexpected bytes",
            reader.remaining()
        )));
    }

    Ok(CacheKey {
        path,
        stamp: FileStamp {
            size,
            modified_secs,
            modified_nanos,
        },
        digest,
        captured_at,
    })
}

/// Bounds-checked cursor over a byte slice
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, FormatError> {
        self.array().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Result<u64, FormatError> {
        self.array().map(u64::from_le_bytes)
    }

    fn optional_u64(&mut self) -> Result<Option<u64>, FormatError> {
        let offset = self.offset;
        match self.take(1)?[0] {
            0 => Ok(None),
            1 => self.u64().map(Some),
            flag => Err(FormatError::InvalidFlag { offset, flag }),
        }
    }
}
