//! Index Module
//!
//! In-memory mapping from document id to the block holding it.
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered by UUID value, so iteration and snapshots are deterministic
//! - Many concurrent lookups, exclusive inserts
//! - Rebuilds are assembled off to the side and swapped in, so readers
//!   never observe a half-built index

use std::collections::BTreeMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::document::Document;

/// Document id → block id
#[derive(Debug, Default)]
pub struct Index {
    entries: RwLock<BTreeMap<Uuid, u64>>,
}

impl Index {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` lives in `block_id` (last write wins)
    pub fn put(&self, id: Uuid, block_id: u64) {
        self.entries.write().insert(id, block_id);
    }

    /// Block holding `id`, if indexed
    pub fn get(&self, id: &Uuid) -> Option<u64> {
        self.entries.read().get(id).copied()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the current mapping, in id order
    pub fn snapshot(&self) -> BTreeMap<Uuid, u64> {
        self.entries.read().clone()
    }

    /// Clear and repopulate from `(block_id, documents)` pairs
    ///
    /// Blocks are applied in the order given; callers pass them in
    /// ascending id order so a duplicated id resolves to the last block.
    pub fn rebuild<'a, I>(&self, blocks: I)
    where
        I: IntoIterator<Item = (u64, &'a [Document])>,
    {
        let mut rebuilt = BTreeMap::new();
        for (block_id, documents) in blocks {
            for document in documents {
                rebuilt.insert(document.id, block_id);
            }
        }
        self.replace(rebuilt);
    }

    /// Swap in a fully built mapping
    pub fn replace(&self, entries: BTreeMap<Uuid, u64>) {
        *self.entries.write() = entries;
    }
}
