//! Storage Module
//!
//! On-disk layout of a collection and the per-block locking around it.
//!
//! ## Responsibilities
//! - Own one size-bounded JSON file per block
//! - Hand out one reader-writer lock per block id
//! - Persist the collection metadata record
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/{collection}/
//! ├── collection.json     name, created_at, max_block_kb, next_block_id
//! ├── block_000000.json   [{"id":"...",...},...]
//! ├── block_000001.json
//! └── ...                 one file for every id in 0..=next_block_id
//! ```

mod block;
mod lock_registry;
mod metadata;

pub use block::Block;
pub use lock_registry::LockRegistry;
pub use metadata::{CollectionMetadata, METADATA_FILENAME};

/// Reader-writer lock guarding one block file
pub type BlockLock = parking_lot::RwLock<()>;
