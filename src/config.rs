//! Configuration for BlockDoc
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{BlockDocError, Result};

/// Main configuration for a BlockDoc database
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all collections
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {collection}/
    ///           ├── collection.json   (collection metadata)
    ///           └── block_000000.json (block files, one per block id)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Block Configuration
    // -------------------------------------------------------------------------
    /// Block size cap in kilobytes, applied to newly created collections
    pub max_block_kb: f64,

    /// How block rewrites are flushed to stable storage
    pub sync_strategy: SyncStrategy,
}

/// Block write sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync every block rewrite before releasing the block's write lock
    EveryWrite,

    /// Never fsync; the OS writes dirty pages back on its own schedule
    OsManaged,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./blockdoc_data"),
            max_block_kb: 1.0,
            sync_strategy: SyncStrategy::OsManaged,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Block size cap in bytes
    pub fn max_block_bytes(&self) -> u64 {
        kb_to_bytes(self.max_block_kb)
    }

    /// Check that the config describes a usable store
    pub fn validate(&self) -> Result<()> {
        validate_block_kb(self.max_block_kb)
    }
}

/// Convert a kilobyte cap to bytes (rounded down)
pub(crate) fn kb_to_bytes(kb: f64) -> u64 {
    (kb * 1024.0).floor() as u64
}

pub(crate) fn validate_block_kb(kb: f64) -> Result<()> {
    if !kb.is_finite() || kb <= 0.0 {
        return Err(BlockDocError::Config(format!(
            "max_block_kb must be a positive number, got {}",
            kb
        )));
    }
    Ok(())
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all collections)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the block size cap (in kilobytes)
    pub fn max_block_kb(mut self, kb: f64) -> Self {
        self.config.max_block_kb = kb;
        self
    }

    /// Set the block sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
