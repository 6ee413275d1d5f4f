//! # BlockDoc
//!
//! A minimal document store:
//! - Named collections of JSON documents with UUID ids
//! - Documents persisted across size-bounded block files
//! - First-fit block placement with per-block reader-writer locks
//! - In-memory id → block index, rebuilt from block files on open
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Database                              │
//! │              (collections by name, Arc-shared)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Collection                             │
//! │         (placement, allocation, lookups, rebuild)            │
//! └──────┬──────────────────────┬─────────────────────┬─────────┘
//!        │                      │                     │
//!        ▼                      ▼                     ▼
//!  ┌─────────────┐      ┌───────────────┐      ┌─────────────┐
//!  │    Index    │      │ Lock Registry │      │   Blocks    │
//!  │  (RwLock)   │      │ (one per id)  │─────▶│ (JSON files)│
//!  └─────────────┘      └───────────────┘      └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod document;
pub mod codec;
pub mod storage;
pub mod index;
pub mod collection;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlockDocError, Result};
pub use config::{Config, SyncStrategy};
pub use document::{parse_document_id, Document};
pub use collection::{Collection, RebuildStats};
pub use database::Database;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BlockDoc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
