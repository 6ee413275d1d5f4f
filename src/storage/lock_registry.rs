//! Lock Registry
//!
//! Hands out exactly one reader-writer lock per block id for the life of
//! a collection.

use std::sync::Arc;

use dashmap::DashMap;

use super::BlockLock;

/// Lazily materialized per-block locks
///
/// ## Concurrency:
/// - Creation goes through `DashMap::entry`, which holds the shard lock
///   across the check and the insert, so concurrent first access to the
///   same id yields one lock instance
/// - Entries are never evicted
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<u64, Arc<BlockLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock for `block_id`, creating it on first access
    pub fn acquire(&self, block_id: u64) -> Arc<BlockLock> {
        if let Some(lock) = self.locks.get(&block_id) {
            return Arc::clone(lock.value());
        }

        let entry = self
            .locks
            .entry(block_id)
            .or_insert_with(|| Arc::new(BlockLock::new(())));
        Arc::clone(entry.value())
    }

    /// Number of locks materialized so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
