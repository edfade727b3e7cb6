//! # Core Module
//!
//! The hashing engine and its persistent cache.
//!
//! ## Modules
//! - `hasher` - Decodes images and computes perceptual hashes
//! - `cache` - Persists hashes to avoid recomputation
//! - `context` - Mediates hash requests through the cache

pub mod cache;
pub mod context;
pub mod hasher;

// Re-export commonly used types
pub use cache::{CacheEntry, CacheStats, HashTriple};
pub use context::{Context, ContextConfig, ContextStats, KeyStrategy};
pub use hasher::{HashAlgorithmKind, ImageHash};
