//! Collection metadata
//!
//! The bootstrap record needed before a collection's index can be rebuilt
//! from its block files.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BlockDocError, Result};

/// File name of the metadata record inside a collection directory
pub const METADATA_FILENAME: &str = "collection.json";

/// Persisted collection metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Collection name
    pub name: String,

    /// When the collection was created
    pub created_at: DateTime<Utc>,

    /// Block size cap in kilobytes
    pub max_block_kb: f64,

    /// Id of the most recently allocated block (not a count)
    pub next_block_id: u64,
}

impl CollectionMetadata {
    /// Metadata for a brand-new collection
    pub fn new(name: &str, max_block_kb: f64) -> Self {
        Self {
            name: name.to_string(),
            created_at: Utc::now(),
            max_block_kb,
            next_block_id: 0,
        }
    }

    /// Metadata path inside a collection directory
    pub fn path(collection_dir: &Path) -> PathBuf {
        collection_dir.join(METADATA_FILENAME)
    }

    /// Load metadata from a collection directory
    ///
    /// Returns `Ok(None)` if no metadata record exists there.
    pub fn load(collection_dir: &Path) -> Result<Option<Self>> {
        let bytes = match fs::read(Self::path(collection_dir)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            BlockDocError::Serialization(format!(
                "invalid metadata in {}: {}",
                collection_dir.display(),
                e
            ))
        })
    }

    /// Persist metadata (temp file + rename)
    pub fn save(&self, collection_dir: &Path) -> Result<()> {
        let path = Self::path(collection_dir);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(self)?;

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
