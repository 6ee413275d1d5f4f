//! Database Module
//!
//! The catalog of collections under one data directory.
//!
//! ## Responsibilities
//! - Create the data directory on open
//! - Create, open, list and drop collections
//! - Share one `Collection` instance (and so one lock registry) per name

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::collection::{validate_collection_name, Collection};
use crate::config::Config;
use crate::error::{BlockDocError, Result};
use crate::storage::CollectionMetadata;

/// A set of collections rooted at `config.data_dir`
///
/// ## Concurrency Model
///
/// - Collection handles are `Arc<Collection>`, cached by name behind an
///   RwLock; every caller of `collection(name)` gets the same instance
/// - Two handles for the same name would each carry their own lock
///   registry and index, so handles are never created outside the cache
pub struct Database {
    /// Database configuration
    config: Config,

    /// Opened collections by name
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Open or create a database with the given config
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        tracing::debug!(data_dir = %config.data_dir.display(), "database opened");

        Ok(Self {
            config,
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Create a new collection
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(BlockDocError::CollectionExists(name.to_string()));
        }

        let collection = Arc::new(Collection::create(&self.config, name)?);
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Open an existing collection (index rebuilt from disk on first open)
    pub fn open_collection(&self, name: &str) -> Result<Arc<Collection>> {
        if let Some(collection) = self.collections.read().get(name) {
            return Ok(Arc::clone(collection));
        }

        let mut collections = self.collections.write();
        if let Some(collection) = collections.get(name) {
            return Ok(Arc::clone(collection));
        }

        let collection = Arc::new(Collection::open(&self.config, name)?);
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// Open a collection, creating it if it does not exist
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        match self.open_collection(name) {
            Err(BlockDocError::CollectionNotFound(_)) => match self.create_collection(name) {
                // Lost a creation race to another caller
                Err(BlockDocError::CollectionExists(_)) => self.open_collection(name),
                other => other,
            },
            other => other,
        }
    }

    /// Names of all collections on disk, sorted
    pub fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.data_dir)? {
            let path = entry?.path();
            if !path.is_dir() || !CollectionMetadata::path(&path).is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a collection and all of its blocks
    ///
    /// Outstanding `Arc<Collection>` handles keep working in memory but
    /// their files are gone.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;

        let mut collections = self.collections.write();
        let dir = self.config.data_dir.join(name);
        if !CollectionMetadata::path(&dir).is_file() {
            return Err(BlockDocError::CollectionNotFound(name.to_string()));
        }

        fs::remove_dir_all(&dir)?;
        collections.remove(name);

        tracing::info!(collection = name, "collection dropped");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
