//! Persistence tests for the JSON file store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use shapecut_pipeline::ValidationRecord;
use shapecut_store::{JsonFileStore, RecordStore, StoreError};

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("json_store").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn record(id: &str) -> ValidationRecord {
    ValidationRecord {
        image_id: id.to_string(),
        valid_x: 120,
        valid_y: 64,
        tolerance: 10,
        shape_width: 33,
        shape_height: 29,
    }
}

#[test]
fn missing_file_opens_empty_and_is_not_created() {
    let dir = scratch("missing");
    let path = dir.join("records.json");
    let store = JsonFileStore::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(!path.exists());
}

#[test]
fn records_survive_reopen() {
    let dir = scratch("reopen");
    let path = dir.join("nested").join("records.json");

    let mut store = JsonFileStore::open(&path).unwrap();
    store.insert(record("beach")).unwrap();
    store.insert(record("forest")).unwrap();
    assert!(path.exists());

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get_by_id("forest").unwrap(), &record("forest"));

    let mut rng = StdRng::seed_from_u64(3);
    let any = reopened.get_random(&mut rng).unwrap();
    assert!(any.image_id == "beach" || any.image_id == "forest");
}

#[test]
fn duplicate_insert_leaves_file_unchanged() {
    let dir = scratch("duplicate");
    let path = dir.join("records.json");
    let mut store = JsonFileStore::open(&path).unwrap();
    store.insert(record("beach")).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let mut clash = record("beach");
    clash.valid_x = 1;
    assert!(matches!(store.insert(clash), Err(StoreError::DuplicateId(_))));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert_eq!(store.get_by_id("beach").unwrap().valid_x, 120);
}

#[test]
fn file_is_a_pretty_json_array() {
    let dir = scratch("format");
    let path = dir.join("records.json");
    let mut store = JsonFileStore::open(&path).unwrap();
    store.insert(record("beach")).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let list = value.as_array().expect("top level should be an array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["image_id"], "beach");
    assert!(json.contains('\n'));
}

#[test]
fn malformed_file_is_rejected() {
    let dir = scratch("malformed");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("records.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Serde(_))));
}

#[test]
fn duplicate_ids_in_file_are_rejected() {
    let dir = scratch("dup_file");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("records.json");
    let json = serde_json::to_string(&vec![record("a"), record("a")]).unwrap();
    std::fs::write(&path, json).unwrap();
    assert!(matches!(
        JsonFileStore::open(&path),
        Err(StoreError::DuplicateId(ref id)) if id == "a"
    ));
}

#[test]
fn failed_save_rolls_back_insert() {
    let dir = scratch("rollback");
    let path = dir.join("records.json");
    let mut store = JsonFileStore::open(&path).unwrap();
    store.insert(record("a")).unwrap();

    // A directory in place of the file makes the final rename fail.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir_all(path.join("occupied")).unwrap();

    assert!(matches!(store.insert(record("b")), Err(StoreError::Io(_))));
    assert_eq!(store.len(), 1);
    assert!(matches!(store.get_by_id("b"), Err(StoreError::NotFound(_))));
}
