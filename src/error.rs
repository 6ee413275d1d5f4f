//! Error types for BlockDoc
//!
//! Provides a unified error type for all operations.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using BlockDocError
pub type Result<T> = std::result::Result<T, BlockDocError>;

/// Unified error type for BlockDoc operations
#[derive(Debug, Error)]
pub enum BlockDocError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Block Errors
    // -------------------------------------------------------------------------
    #[error("Block {block_id} is corrupt: {reason}")]
    CorruptBlock { block_id: u64, reason: String },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Document not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid document identifier: {0:?}")]
    InvalidIdentifier(String),

    // -------------------------------------------------------------------------
    // Collection Errors
    // -------------------------------------------------------------------------
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),
}

impl BlockDocError {
    /// Whether this error means "no such document" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlockDocError::NotFound(_))
    }
}

impl From<serde_json::Error> for BlockDocError {
    fn from(e: serde_json::Error) -> Self {
        BlockDocError::Serialization(e.to_string())
    }
}
