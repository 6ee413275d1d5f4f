//! Tests for CollectionMetadata
//!
//! These tests verify:
//! - Fresh metadata defaults
//! - Save/load through the metadata file
//! - Absent and malformed metadata records

use std::fs;

use blockdoc::storage::{CollectionMetadata, METADATA_FILENAME};
use blockdoc::BlockDocError;
use tempfile::TempDir;

#[test]
fn test_new_metadata_starts_at_block_zero() {
    let metadata = CollectionMetadata::new("orders", 2.5);

    assert_eq!(metadata.name, "orders");
    assert_eq!(metadata.next_block_id, 0);
    assert_eq!(metadata.max_block_kb, 2.5);
}

#[test]
fn test_load_absent_metadata_is_none() {
    let temp_dir = TempDir::new().unwrap();

    assert!(CollectionMetadata::load(temp_dir.path()).unwrap().is_none());
}

#[test]
fn test_save_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let mut metadata = CollectionMetadata::new("orders", 1.0);
    metadata.next_block_id = 9;

    metadata.save(temp_dir.path()).unwrap();
    let loaded = CollectionMetadata::load(temp_dir.path()).unwrap().unwrap();

    assert_eq!(loaded, metadata);
    assert!(temp_dir.path().join(METADATA_FILENAME).is_file());
}

#[test]
fn test_save_overwrites_previous_record() {
    let temp_dir = TempDir::new().unwrap();
    let mut metadata = CollectionMetadata::new("orders", 1.0);
    metadata.save(temp_dir.path()).unwrap();

    metadata.next_block_id = 3;
    metadata.save(temp_dir.path()).unwrap();

    let loaded = CollectionMetadata::load(temp_dir.path()).unwrap().unwrap();
    assert_eq!(loaded.next_block_id, 3);
}

#[test]
fn test_malformed_metadata_is_serialization_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(METADATA_FILENAME), b"{not json").unwrap();

    let err = CollectionMetadata::load(temp_dir.path()).unwrap_err();
    assert!(matches!(err, BlockDocError::Serialization(_)));
}
