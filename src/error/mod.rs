//! # Error Module
//!
//! Error types for hashing, caching, and the handle-based C surface.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Stable kinds** - every error maps onto an [`ErrorKind`] and a C error code

use std::path::PathBuf;
use thiserror::Error;

/// Top-level library error
#[derive(Error, Debug)]
pub enum PihashError {
    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid context handle")]
    InvalidHandle,

    #[error("Invalid image path: {0}")]
    InvalidPath(String),
}

impl PihashError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PihashError::Hash(e) => e.kind(),
            PihashError::Cache(e) => e.kind(),
            PihashError::InvalidHandle => ErrorKind::InvalidHandle,
            PihashError::InvalidPath(_) => ErrorKind::InvalidPath,
        }
    }
}

/// Errors that occur while reading, decoding or hashing an image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Hash computation failed: {0}")]
    ComputationFailed(String),

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            HashError::IoError { .. } => ErrorKind::Io,
            HashError::DecodeError { .. }
            | HashError::EmptyImage { .. }
            | HashError::ComputationFailed(_) => ErrorKind::Decode,
        }
    }
}

/// Errors that occur with the hash cache file
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache file {path} is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Failed to persist cache file {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Corrupted { .. } => ErrorKind::CacheCorrupt,
            CacheError::Io { .. } | CacheError::PersistFailed { .. } => ErrorKind::Io,
        }
    }
}

/// Coarse error classification shared with C callers.
///
/// The discriminants are the values returned by `ext_last_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    /// No error
    None = 0,
    /// Image or cache file unreadable/unwritable
    Io = 1,
    /// Bytes are not a valid or supported image
    Decode = 2,
    /// Cache file failed structural validation
    CacheCorrupt = 3,
    /// NULL or closed context handle
    InvalidHandle = 4,
    /// NULL or unrepresentable image path
    InvalidPath = 5,
    /// A panic was caught at the C boundary
    Internal = 6,
}

impl ErrorKind {
    /// Numeric code exposed through the C ABI
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PihashError>;
