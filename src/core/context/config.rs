//! Context configuration.

use serde::{Deserialize, Serialize};

/// How a cached entry is matched against the file on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Trust an unchanged, non-racy size and mtime; digest only when in doubt
    #[default]
    Metadata,
    /// Read and digest the file on every request
    Checksum,
}

/// Default width of the racy-stamp window in seconds
pub const DEFAULT_RACY_WINDOW_SECS: u64 = 2;

/// Configuration builder for a [`Context`](super::Context)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    key_strategy: KeyStrategy,
    racy_window_secs: u64,
}

impl ContextConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            key_strategy: KeyStrategy::Metadata,
            racy_window_secs: DEFAULT_RACY_WINDOW_SECS,
        }
    }

    /// Set how cached entries are validated
    pub fn key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Set the racy-stamp window.
    ///
    /// An entry whose file was modified less than this many seconds before
    /// the stamp was captured is re-verified by digest even if size and
    /// mtime still match. Filesystems with coarse timestamps need at least
    /// their mtime granularity here.
    pub fn racy_window_secs(mut self, secs: u64) -> Self {
        self.racy_window_secs = secs;
        self
    }

    /// Configured key strategy
    pub fn strategy(&self) -> KeyStrategy {
        self.key_strategy
    }

    /// Configured racy window
    pub fn racy_window(&self) -> u64 {
        self.racy_window_secs
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new()
    }
}
