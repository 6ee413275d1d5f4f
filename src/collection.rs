//! Collection Module
//!
//! A named set of documents spread over size-bounded blocks.
//!
//! ## Responsibilities
//! - Place new documents (first-fit by ascending block id)
//! - Allocate new blocks when none has room
//! - Look documents up through the index
//! - Rebuild the index from block files on open

use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crossbeam::channel;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::codec;
use crate::config::{self, Config, SyncStrategy};
use crate::document::{parse_document_id, Document, ID_FIELD};
use crate::error::{BlockDocError, Result};
use crate::index::Index;
use crate::storage::{Block, CollectionMetadata, LockRegistry};

/// Outcome of an index rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Block ids visited (always `next_block_id + 1`)
    pub blocks_scanned: u64,
    /// Blocks with no file (or an empty one)
    pub blocks_missing: u64,
    /// Blocks skipped because their content could not be parsed
    pub blocks_corrupt: u64,
    /// Index entries recorded (duplicate ids counted once per occurrence)
    pub documents_indexed: u64,
}

/// A document collection
///
/// ## Concurrency:
/// - Block I/O is guarded per block through `locks`
/// - `metadata` write lock serializes block allocation
/// - `index` carries its own RwLock
/// - `index_epoch` orders index rebuilds against puts: a put holds it
///   shared from placement to index update, a rebuild holds it exclusive
///   from the first block scanned to the index swap
/// - Block handles are rebuilt per operation and never cached
/// - All methods use `&self`; share a collection through `Arc`
pub struct Collection {
    /// Collection name (fixed for the collection's lifetime)
    name: String,

    /// Collection directory ({data_dir}/{name})
    dir: PathBuf,

    /// Block fsync policy
    sync_strategy: SyncStrategy,

    /// Persisted bootstrap record (name, created_at, cap, next_block_id)
    metadata: RwLock<CollectionMetadata>,

    /// One lock per block id
    locks: LockRegistry,

    /// Document id → block id
    index: Index,

    /// Held exclusively while the index is rebuilt
    index_epoch: RwLock<()>,
}

impl Collection {
    /// Create a new, empty collection under `config.data_dir`
    ///
    /// Fails with `CollectionExists` if a metadata record is already there.
    pub fn create(config: &Config, name: &str) -> Result<Self> {
        validate_collection_name(name)?;
        config.validate()?;

        let dir = config.data_dir.join(name);
        fs::create_dir_all(&dir)?;
        if CollectionMetadata::load(&dir)?.is_some() {
            return Err(BlockDocError::CollectionExists(name.to_string()));
        }

        let metadata = CollectionMetadata::new(name, config.max_block_kb);
        metadata.save(&dir)?;

        tracing::info!(
            collection = name,
            max_block_kb = metadata.max_block_kb,
            "collection created"
        );

        Ok(Self::from_metadata(dir, metadata, config.sync_strategy))
    }

    /// Open an existing collection and rebuild its index from disk
    ///
    /// If block files exist past the recorded `next_block_id` (the metadata
    /// write was lost), the counter is advanced to cover them.
    pub fn open(config: &Config, name: &str) -> Result<Self> {
        validate_collection_name(name)?;

        let dir = config.data_dir.join(name);
        let mut metadata = CollectionMetadata::load(&dir)?
            .ok_or_else(|| BlockDocError::CollectionNotFound(name.to_string()))?;

        if let Some(highest) = Self::highest_block_on_disk(&dir)? {
            if highest > metadata.next_block_id {
                tracing::warn!(
                    collection = name,
                    recorded = metadata.next_block_id,
                    found = highest,
                    "block files beyond recorded next_block_id; advancing"
                );
                metadata.next_block_id = highest;
                metadata.save(&dir)?;
            }
        }

        let collection = Self::from_metadata(dir, metadata, config.sync_strategy);
        let stats = collection.rebuild_index_from_disk()?;

        tracing::info!(
            collection = name,
            blocks = stats.blocks_scanned,
            documents = collection.index.len(),
            "collection opened"
        );

        Ok(collection)
    }

    fn from_metadata(dir: PathBuf, metadata: CollectionMetadata, sync_strategy: SyncStrategy) -> Self {
        Self {
            name: metadata.name.clone(),
            dir,
            sync_strategy,
            metadata: RwLock::new(metadata),
            locks: LockRegistry::new(),
            index: Index::new(),
            index_epoch: RwLock::new(()),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a document
    ///
    /// `explicit_id` empty ⇒ a fresh UUID is generated; otherwise it must
    /// parse as a UUID (checked before any I/O). An `id` key in `fields` is
    /// replaced. Returns the assigned id.
    ///
    /// The index is updated only after the block write succeeded. A
    /// concurrent rebuild either sees the appended document on disk or
    /// starts after the index entry is in place.
    pub fn put(&self, fields: Map<String, Value>, explicit_id: &str) -> Result<Uuid> {
        let id = parse_document_id(explicit_id)?;
        let document = Document::new(id, fields);

        let block_id = {
            let _epoch = self.index_epoch.read();
            let block_id = self.place(&document)?;
            self.index.put(id, block_id);
            block_id
        };

        tracing::debug!(collection = %self.name, %id, block = block_id, "document stored");
        Ok(id)
    }

    /// Insert many documents on `workers` threads
    ///
    /// A string `id` field inside a document is used as its explicit id.
    /// Returns the assigned ids in input order, or the error of the
    /// earliest failing document (documents that did succeed stay stored
    /// and indexed).
    pub fn put_many(&self, batch: Vec<Map<String, Value>>, workers: usize) -> Result<Vec<Uuid>> {
        let total = batch.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = workers.clamp(1, total);

        let (job_tx, job_rx) = channel::bounded::<(usize, Map<String, Value>)>(workers * 2);
        let (result_tx, result_rx) = channel::unbounded::<(usize, Result<Uuid>)>();

        crossbeam::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move |_| {
                    for (position, mut fields) in job_rx.iter() {
                        let result = take_explicit_id(&mut fields)
                            .and_then(|explicit_id| self.put(fields, &explicit_id));
                        if result_tx.send((position, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for job in batch.into_iter().enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
            drop(job_tx);
        })
        .map_err(|_| BlockDocError::WorkerPanicked("batch insert worker panicked".to_string()))?;

        let mut ids: Vec<Option<Uuid>> = vec![None; total];
        let mut first_error: Option<(usize, BlockDocError)> = None;
        for (position, result) in result_rx.iter() {
            match result {
                Ok(id) => ids[position] = Some(id),
                Err(e) => {
                    if first_error.as_ref().map_or(true, |(p, _)| position < *p) {
                        first_error = Some((position, e));
                    }
                }
            }
        }

        if let Some((_, e)) = first_error {
            return Err(e);
        }
        Ok(ids.into_iter().flatten().collect())
    }

    /// Change the block cap for future placements (persisted)
    pub fn set_max_block_kb(&self, max_block_kb: f64) -> Result<()> {
        config::validate_block_kb(max_block_kb)?;

        let mut metadata = self.metadata.write();
        let mut updated = metadata.clone();
        updated.max_block_kb = max_block_kb;
        updated.save(&self.dir)?;
        *metadata = updated;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a document by id
    ///
    /// `NotFound` if the id is not indexed, or its block no longer holds it.
    pub fn get_by_id(&self, id: &Uuid) -> Result<Document> {
        let block_id = self.index.get(id).ok_or(BlockDocError::NotFound(*id))?;

        let mut block = self.block_handle(block_id);
        let lock = self.locks.acquire(block_id);
        let documents = block.load(&lock)?;

        // Most recent copy wins if the id was appended twice
        let found = documents
            .iter()
            .rev()
            .find(|document| document.id == *id)
            .cloned();
        found.ok_or(BlockDocError::NotFound(*id))
    }

    /// Get a document by its string id
    pub fn get_by_str(&self, id: &str) -> Result<Document> {
        let id = Uuid::parse_str(id).map_err(|_| BlockDocError::InvalidIdentifier(id.to_string()))?;
        self.get_by_id(&id)
    }

    /// Whether `id` is indexed
    pub fn contains(&self, id: &Uuid) -> bool {
        self.index.contains(id)
    }

    /// Refresh the block list; with `with_content`, load each block under its lock
    pub fn list_blocks(&self, with_content: bool) -> Result<Vec<Block>> {
        let mut blocks = self.refresh_blocks();
        if with_content {
            for block in &mut blocks {
                let lock = self.locks.acquire(block.id());
                block.load(&lock)?;
            }
        }
        Ok(blocks)
    }

    /// Handle for one block, if `block_id` is within 0..=next_block_id
    pub fn block(&self, block_id: u64) -> Option<Block> {
        (block_id <= self.next_block_id()).then(|| self.block_handle(block_id))
    }

    /// Every document, block by block in ascending id order
    pub fn documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for mut block in self.list_blocks(true)? {
            documents.extend(block.take_documents().unwrap_or_default());
        }
        Ok(documents)
    }

    // =========================================================================
    // Index
    // =========================================================================

    /// Rebuild the index by rescanning blocks 0..=next_block_id
    ///
    /// Absent blocks contribute nothing. A corrupt block is skipped and
    /// the rebuild continues. The new index replaces the old one only
    /// when the scan completes. Puts wait while a rebuild runs.
    pub fn rebuild_index_from_disk(&self) -> Result<RebuildStats> {
        let _epoch = self.index_epoch.write();

        let next_block_id = self.next_block_id();
        let mut stats = RebuildStats::default();
        let mut scanned: Vec<(u64, Vec<Document>)> = Vec::new();

        for block_id in 0..=next_block_id {
            stats.blocks_scanned += 1;

            let block = self.block_handle(block_id);
            let lock = self.locks.acquire(block_id);
            let rescanned = {
                let _guard = lock.read_recursive();
                block.rescan()
            };

            match rescanned {
                Ok(Some(documents)) => {
                    stats.documents_indexed += documents.len() as u64;
                    scanned.push((block_id, documents));
                }
                Ok(None) => stats.blocks_missing += 1,
                Err(BlockDocError::CorruptBlock { block_id, reason }) => {
                    tracing::warn!(
                        collection = %self.name,
                        block = block_id,
                        %reason,
                        "skipping corrupt block during index rebuild"
                    );
                    stats.blocks_corrupt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.index.rebuild(
            scanned
                .iter()
                .map(|(block_id, documents)| (*block_id, documents.as_slice())),
        );

        tracing::debug!(
            collection = %self.name,
            blocks = stats.blocks_scanned,
            missing = stats.blocks_missing,
            corrupt = stats.blocks_corrupt,
            documents = stats.documents_indexed,
            "index rebuilt"
        );

        Ok(stats)
    }

    /// Copy of the index, in id order
    pub fn index_snapshot(&self) -> BTreeMap<Uuid, u64> {
        self.index.snapshot()
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.metadata.read().created_at
    }

    pub fn max_block_kb(&self) -> f64 {
        self.metadata.read().max_block_kb
    }

    /// Block cap in bytes
    pub fn max_block_bytes(&self) -> u64 {
        config::kb_to_bytes(self.max_block_kb())
    }

    /// Id of the most recently allocated block
    pub fn next_block_id(&self) -> u64 {
        self.metadata.read().next_block_id
    }

    /// Number of blocks (`next_block_id + 1`)
    pub fn block_count(&self) -> u64 {
        self.next_block_id() + 1
    }

    /// Copy of the persisted metadata record
    pub fn metadata(&self) -> CollectionMetadata {
        self.metadata.read().clone()
    }

    /// Collection directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The per-block lock registry
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// First-fit placement; returns the block id the document landed in
    ///
    /// Each candidate is re-checked under its write lock (`try_append`); a
    /// block that filled up in between is skipped. When nothing has room a
    /// new block is allocated, unless another writer already did, in which
    /// case the scan starts over.
    fn place(&self, document: &Document) -> Result<u64> {
        let document_len = codec::encode_document(document)?.len() as u64;

        loop {
            let mut blocks = self.refresh_blocks();
            let observed_last = blocks.last().map_or(0, Block::id);

            for block in &mut blocks {
                if !block.has_room_for(document_len)? {
                    continue;
                }
                let lock = self.locks.acquire(block.id());
                if block.try_append(document, document_len, &lock)? {
                    return Ok(block.id());
                }
            }

            if let Some(block_id) = self.allocate_block(observed_last)? {
                let mut block = self.block_handle(block_id);
                let lock = self.locks.acquire(block_id);
                if block.try_append(document, document_len, &lock)? {
                    return Ok(block_id);
                }
            }
        }
    }

    /// Bump `next_block_id` if it still equals `observed_last`
    ///
    /// Returns `None` when another writer allocated first.
    fn allocate_block(&self, observed_last: u64) -> Result<Option<u64>> {
        let mut metadata = self.metadata.write();
        if metadata.next_block_id != observed_last {
            return Ok(None);
        }

        let mut updated = metadata.clone();
        updated.next_block_id += 1;
        updated.save(&self.dir)?;
        *metadata = updated;

        let block_id = metadata.next_block_id;
        drop(metadata);

        tracing::debug!(collection = %self.name, block = block_id, "allocated new block");
        Ok(Some(block_id))
    }

    /// Block list for 0..=next_block_id (handles only, no content)
    fn refresh_blocks(&self) -> Vec<Block> {
        let (next_block_id, max_bytes) = {
            let metadata = self.metadata.read();
            (metadata.next_block_id, config::kb_to_bytes(metadata.max_block_kb))
        };

        (0..=next_block_id)
            .map(|block_id| self.new_block(block_id, max_bytes))
            .collect()
    }

    fn block_handle(&self, block_id: u64) -> Block {
        self.new_block(block_id, self.max_block_bytes())
    }

    fn new_block(&self, block_id: u64, max_bytes: u64) -> Block {
        Block::new(&self.dir, &self.name, block_id, max_bytes, self.sync_strategy)
    }

    /// Highest block id with a file in `dir`
    fn highest_block_on_disk(dir: &Path) -> Result<Option<u64>> {
        let mut highest = None;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if let Some(block_id) = Block::parse_block_id(&path) {
                highest = highest.max(Some(block_id));
            }
        }
        Ok(highest)
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Collection {}

impl Hash for Collection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let metadata = self.metadata.read();
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("next_block_id", &metadata.next_block_id)
            .field("max_block_kb", &metadata.max_block_kb)
            .field("documents", &self.index.len())
            .finish()
    }
}

/// Collection names: non-empty, ASCII letters, digits, `_` and `-`
pub fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(BlockDocError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}

/// Pull a string `id` out of a document's fields ("" when absent)
fn take_explicit_id(fields: &mut Map<String, Value>) -> Result<String> {
    match fields.remove(ID_FIELD) {
        None => Ok(String::new()),
        Some(Value::String(id)) => Ok(id),
        Some(other) => Err(BlockDocError::InvalidIdentifier(other.to_string())),
    }
}
