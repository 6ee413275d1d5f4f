//! Tests for the block codec and documents
//!
//! These tests verify:
//! - Block decoding of empty, valid and corrupt bytes
//! - The appended-size arithmetic (array framing and separators)
//! - Document id handling

use blockdoc::codec::{appended_size, decode_block, encode_block, encode_document};
use blockdoc::{parse_document_id, BlockDocError, Document};
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn sample(n: i64) -> Document {
    Document::from_value(Uuid::new_v4(), json!({"n": n, "tag": "sample"})).unwrap()
}

// =============================================================================
// Block Decoding
// =============================================================================

#[test]
fn test_decode_empty_bytes_is_none() {
    assert!(decode_block(0, b"").unwrap().is_none());
    assert!(decode_block(0, b"  \n\t").unwrap().is_none());
}

#[test]
fn test_decode_empty_array() {
    assert_eq!(decode_block(0, b"[]").unwrap(), Some(Vec::new()));
}

#[test]
fn test_decode_encoded_block() {
    let documents = vec![sample(1), sample(2)];
    let bytes = encode_block(&documents).unwrap();

    assert_eq!(decode_block(0, &bytes).unwrap(), Some(documents));
}

#[test]
fn test_decode_garbage_is_corrupt_block() {
    let err = decode_block(7, b"not json at all").unwrap_err();
    assert!(matches!(err, BlockDocError::CorruptBlock { block_id: 7, .. }));
}

#[test]
fn test_decode_document_without_uuid_is_corrupt_block() {
    let err = decode_block(2, br#"[{"id": "nope", "a": 1}]"#).unwrap_err();
    assert!(matches!(err, BlockDocError::CorruptBlock { block_id: 2, .. }));

    let err = decode_block(2, br#"[{"a": 1}]"#).unwrap_err();
    assert!(matches!(err, BlockDocError::CorruptBlock { block_id: 2, .. }));
}

// =============================================================================
// Size Arithmetic
// =============================================================================

#[test]
fn test_appended_size_matches_encoded_block() {
    let documents: Vec<Document> = (0..5).map(sample).collect();

    let mut current = 0;
    for i in 0..documents.len() {
        let doc_len = encode_document(&documents[i]).unwrap().len() as u64;
        let predicted = appended_size(current, doc_len);
        let actual = encode_block(&documents[..=i]).unwrap().len() as u64;

        assert_eq!(predicted, actual);
        current = actual;
    }
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_document_serializes_id_first() {
    let id = Uuid::new_v4();
    let document = Document::from_value(id, json!({"a": 1})).unwrap();

    let text = String::from_utf8(encode_document(&document).unwrap()).unwrap();
    assert_eq!(text, format!(r#"{{"id":"{}","a":1}}"#, id));
}

#[test]
fn test_document_new_replaces_id_field() {
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!("caller-supplied"));
    fields.insert("name".to_string(), json!("alice"));

    let id = Uuid::new_v4();
    let document = Document::new(id, fields);

    assert!(!document.fields().contains_key("id"));
    assert_eq!(document.get("id"), Some(json!(id.to_string())));
    assert_eq!(document.get("name"), Some(json!("alice")));
}

#[test]
fn test_document_from_non_object_fails() {
    let err = Document::from_value(Uuid::new_v4(), json!([1, 2, 3])).unwrap_err();
    assert!(matches!(err, BlockDocError::Serialization(_)));
}

#[test]
fn test_document_into_value_includes_id() {
    let id = Uuid::new_v4();
    let value = Document::from_value(id, json!({"x": true})).unwrap().into_value();

    assert_eq!(value, json!({"id": id.to_string(), "x": true}));
}

#[test]
fn test_parse_document_id() {
    let generated = parse_document_id("").unwrap();
    assert_eq!(generated.get_version_num(), 4);

    let explicit = Uuid::new_v4();
    assert_eq!(parse_document_id(&explicit.to_string()).unwrap(), explicit);

    let err = parse_document_id("definitely-not-a-uuid").unwrap_err();
    assert!(matches!(err, BlockDocError::InvalidIdentifier(ref s) if s == "definitely-not-a-uuid"));
}

#[test]
fn test_document_value_roundtrip_through_serde() {
    let document = sample(9);
    let value: Value = serde_json::to_value(&document).unwrap();

    assert_eq!(value["n"], json!(9));
    assert_eq!(serde_json::from_value::<Document>(value).unwrap(), document);
}
