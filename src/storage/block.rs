//! Block
//!
//! One size-bounded segment of a collection, backed by one JSON file.
//!
//! A `Block` is a cheap handle: its identity (collection + id) fixes the
//! file path, and content is only read when explicitly requested. The
//! block's lock lives in the collection's `LockRegistry` so it can be
//! taken before the file is touched.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::codec::{self, appended_size};
use crate::config::SyncStrategy;
use crate::document::Document;
use crate::error::Result;

use super::BlockLock;

/// File name prefix for block files
const BLOCK_PREFIX: &str = "block_";

/// File extension for block files
const BLOCK_EXTENSION: &str = "json";

/// Handle to one block of a collection
#[derive(Debug, Clone)]
pub struct Block {
    /// Owning collection name
    collection: String,
    /// Block id (position in the collection's block sequence)
    id: u64,
    /// Backing file
    path: PathBuf,
    /// Size cap in bytes
    max_bytes: u64,
    /// Whether rewrites are fsynced
    sync_strategy: SyncStrategy,
    /// Content, once loaded
    documents: Option<Vec<Document>>,
}

impl Block {
    /// Create a handle for block `id` inside `collection_dir` (no I/O)
    pub fn new(
        collection_dir: &Path,
        collection: &str,
        id: u64,
        max_bytes: u64,
        sync_strategy: SyncStrategy,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            id,
            path: Self::path_for(collection_dir, id),
            max_bytes,
            sync_strategy,
            documents: None,
        }
    }

    /// Block file path for an id
    /// (dir, 7) → "{dir}/block_000007.json"
    pub fn path_for(collection_dir: &Path, id: u64) -> PathBuf {
        collection_dir.join(format!("{}{:06}.{}", BLOCK_PREFIX, id, BLOCK_EXTENSION))
    }

    /// Parse a block id from a file name
    /// "block_000042.json" → Some(42)
    pub fn parse_block_id(path: &Path) -> Option<u64> {
        if path.extension()? != BLOCK_EXTENSION {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix(BLOCK_PREFIX)?.parse().ok()
    }

    // =========================================================================
    // Locked Operations
    // =========================================================================

    /// Load the block's documents under its read lock
    ///
    /// A missing file is an empty block.
    pub fn load(&mut self, lock: &BlockLock) -> Result<&[Document]> {
        let documents = {
            let _guard = lock.read_recursive();
            self.read_documents()?.unwrap_or_default()
        };
        Ok(self.documents.insert(documents).as_slice())
    }

    /// Append a document under the block's write lock, ignoring the cap
    ///
    /// Loads the current content, adds the document, and rewrites the
    /// whole file.
    pub fn append(&mut self, document: &Document, lock: &BlockLock) -> Result<()> {
        let _guard = lock.write();
        self.append_locked(document)
    }

    /// Append a document under the write lock if it still fits
    ///
    /// The capacity check is repeated after the lock is held, so two
    /// writers that both saw room in a stale size cannot overfill the
    /// block. Returns `Ok(false)` (nothing written) when it no longer fits.
    pub fn try_append(
        &mut self,
        document: &Document,
        document_len: u64,
        lock: &BlockLock,
    ) -> Result<bool> {
        let _guard = lock.write();

        let current = self.size_on_disk()?;
        if !self.fits(current, document_len) {
            tracing::debug!(
                collection = %self.collection,
                block = self.id,
                current,
                document_len,
                "block filled up before write lock was acquired"
            );
            return Ok(false);
        }

        if current == 0 && appended_size(0, document_len) > self.max_bytes {
            tracing::warn!(
                collection = %self.collection,
                block = self.id,
                document_len,
                max_bytes = self.max_bytes,
                "document exceeds the block cap; storing it alone in an empty block"
            );
        }

        self.append_locked(document)?;
        Ok(true)
    }

    // =========================================================================
    // Unlocked Operations
    // =========================================================================

    /// Current file length in bytes (0 if the file does not exist)
    pub fn size_on_disk(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a document of `document_len` bytes fits, by the last observed size
    ///
    /// Non-empty blocks need `size + document_len < max_bytes`; the `,`
    /// separator then keeps the rewritten file within `max_bytes`. An empty
    /// block always accepts a document.
    pub fn has_room_for(&self, document_len: u64) -> Result<bool> {
        let current = self.size_on_disk()?;
        Ok(self.fits(current, document_len))
    }

    /// Re-read the file for index rebuild
    ///
    /// Returns `Ok(None)` when there is no block file at this id.
    pub fn rescan(&self) -> Result<Option<Vec<Document>>> {
        self.read_documents()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Loaded content, `None` until `load`/`append` ran on this handle
    pub fn documents(&self) -> Option<&[Document]> {
        self.documents.as_deref()
    }

    /// Drop loaded content and hand it to the caller
    pub fn take_documents(&mut self) -> Option<Vec<Document>> {
        self.documents.take()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn fits(&self, current: u64, document_len: u64) -> bool {
        current == 0 || current + document_len < self.max_bytes
    }

    /// Read and decode the file; `None` if absent or empty
    fn read_documents(&self) -> Result<Option<Vec<Document>>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        codec::decode_block(self.id, &bytes)
    }

    /// Load, push, rewrite (caller holds the write lock)
    fn append_locked(&mut self, document: &Document) -> Result<()> {
        let mut documents = self.read_documents()?.unwrap_or_default();
        documents.push(document.clone());

        let bytes = codec::encode_block(&documents)?;
        self.write_file(&bytes)?;

        tracing::trace!(
            collection = %self.collection,
            block = self.id,
            documents = documents.len(),
            bytes = bytes.len(),
            "block rewritten"
        );

        self.documents = Some(documents);
        Ok(())
    }

    /// Write to a temp file, then rename it over the block file
    fn write_file(&self, bytes: &[u8]) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(bytes)?;
            file.flush()?;
            if self.sync_strategy == SyncStrategy::EveryWrite {
                file.sync_all()?;
            }
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}
