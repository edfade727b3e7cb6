//! # pihash
//!
//! Perceptual image hashing with a persistent cache.
//!
//! Images are reduced to 64-bit fingerprints (average, difference and DCT
//! perceptual hashes) that can be compared by Hamming distance. Results
//! are cached per file so repeated requests skip decoding.
//!
//! ## Architecture
//! - `core` - Hash engines, cache store and the hashing context
//! - `ffi` - Handle-based C interface (`ext_init`, `ext_get_*`, `ext_free`)
//! - `error` - Error types and the error codes shared with C callers
//!
//! ## Example
//! ```rust,ignore
//! use pihash::core::context::Context;
//! use pihash::core::hasher::HashAlgorithmKind;
//!
//! let mut context = Context::open("hashes.bin".as_ref())?;
//! let dhash = context.get_hash("photo.jpg".as_ref(), HashAlgorithmKind::Difference)?;
//! context.close()?;
//! ```

pub mod core;
pub mod error;
pub mod ffi;

// Re-export commonly used types at the crate root
pub use crate::core::context::{Context, ContextConfig, KeyStrategy};
pub use crate::core::hasher::{hamming_distance, HashAlgorithmKind, ImageHash};
pub use error::{ErrorKind, PihashError, Result};

/// Initialize tracing for binaries
///
/// Honours `RUST_LOG`, falling back to warnings only. The library itself
/// never installs a subscriber.
pub fn init_tracing() {
    init_tracing_with("warn");
}

/// Initialize tracing with a fallback filter used when `RUST_LOG` is unset
pub fn init_tracing_with(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // Already initialized (e.g. by an embedding application) is fine
    let _ = tracing::subscriber::set_global_default(subscriber);
}
