//! Block codec
//!
//! Encoding and decoding of documents and block files.
//!
//! ## Block File Format
//! ```text
//! [{"id":"...",...},{"id":"...",...},...]
//! ```
//! A compact JSON array, rewritten whole on every append. An empty
//! (or whitespace-only) file means "no data".

use crate::document::Document;
use crate::error::{BlockDocError, Result};

/// Bytes added by the surrounding `[` and `]` of a block array
const ARRAY_FRAMING: u64 = 2;

/// Bytes added by the `,` between two documents
const SEPARATOR: u64 = 1;

/// Encode a single document to compact JSON
pub fn encode_document(document: &Document) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(document)?)
}

/// Encode a full block (ordered documents) to its on-disk form
pub fn encode_block(documents: &[Document]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(documents)?)
}

/// Decode a block file's bytes
///
/// Returns:
/// - `Ok(None)` — no data (empty file)
/// - `Ok(Some(docs))` — documents in stored order
/// - `Err(CorruptBlock)` — bytes present but not a document array
pub fn decode_block(block_id: u64, bytes: &[u8]) -> Result<Option<Vec<Document>>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice::<Vec<Document>>(bytes)
        .map(Some)
        .map_err(|e| BlockDocError::CorruptBlock {
            block_id,
            reason: e.to_string(),
        })
}

/// Exact size of a block file after appending one encoded document
///
/// `current_len` is the size of the existing (compact) block file,
/// 0 when the block has no data yet. Placement itself compares
/// `current_len + document_len` against the cap; this is the resulting
/// file length.
pub fn appended_size(current_len: u64, document_len: u64) -> u64 {
    if current_len == 0 {
        document_len + ARRAY_FRAMING
    } else {
        current_len + SEPARATOR + document_len
    }
}
