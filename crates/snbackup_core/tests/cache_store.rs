use serde_json::json;
use snbackup_core::{CacheError, CacheOp, CacheStore, NoteRecord, Timestamp};

fn full_record(key: &str, syncnum: i64, deleted: bool) -> NoteRecord {
    let mut record = NoteRecord::new(key, syncnum);
    record.content = format!("body of {key}");
    record.tags = vec!["work".to_string(), "todo".to_string()];
    record.systemtags = vec!["pinned".to_string()];
    record.createdate = Some(Timestamp::parse("1263348000.123456").unwrap());
    record.modifydate = Some(Timestamp::parse("1263349000").unwrap());
    record.deleted = deleted;
    record.extra.insert("version".to_string(), json!(4));
    record
}

#[test]
fn load_creates_missing_file_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache").join("notes.json");

    let store = CacheStore::load(&path).unwrap();

    assert!(store.is_empty());
    assert!(path.exists());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn save_then_load_round_trips_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");

    let mut store = CacheStore::load(&path).unwrap();
    store.put("live", full_record("live", 3, false));
    store.put("trashed", full_record("trashed", 9, true));
    store.save().unwrap();

    let reloaded = CacheStore::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("live"), store.get("live"));
    assert_eq!(reloaded.get("trashed"), store.get("trashed"));
    let trashed = reloaded.get("trashed").unwrap();
    assert!(trashed.deleted);
    assert_eq!(trashed.syncnum, 9);
    assert_eq!(trashed.extra.get("version"), Some(&json!(4)));
}

#[test]
fn cache_file_uses_service_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    let mut store = CacheStore::empty(&path);
    store.put("k1", full_record("k1", 2, true));
    store.save().unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let entry = &raw["k1"];
    assert_eq!(entry["key"], json!("k1"));
    assert_eq!(entry["syncnum"], json!(2));
    assert_eq!(entry["deleted"], json!(1));
    assert_eq!(entry["createdate"], json!("1263348000.123456"));
    assert_eq!(entry["systemtags"], json!(["pinned"]));
}

#[test]
fn save_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later").join("notes.json");
    let mut store = CacheStore::empty(&path);
    store.put("a", NoteRecord::new("a", 1));

    store.save().unwrap();

    assert!(path.exists());
    assert_eq!(CacheStore::load(&path).unwrap().len(), 1);
}

#[test]
fn save_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    let mut store = CacheStore::empty(&path);
    for idx in 0..3 {
        store.put(format!("n{idx}"), NoteRecord::new(format!("n{idx}"), idx));
        store.save().unwrap();
    }

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["notes.json".to_string()]);
}

#[test]
fn corrupt_file_is_reported_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, "{\"a\": {\"key\": ").unwrap();

    let err = CacheStore::load(&path).unwrap_err();

    assert!(matches!(err, CacheError::Corrupt { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\": {\"key\": ");
}

#[test]
fn mismatched_entry_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, r#"{"a": {"key": "b", "syncnum": 1}}"#).unwrap();

    let err = CacheStore::load(&path).unwrap_err();
    assert!(matches!(err, CacheError::InconsistentEntry { .. }));
}

#[test]
fn zero_length_file_loads_as_empty_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, "").unwrap();

    assert!(CacheStore::load(&path).unwrap().is_empty());
}

#[test]
fn non_not_found_errors_propagate_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    // A directory at the cache path cannot be read as a file.
    let path = dir.path().join("notes.json");
    std::fs::create_dir(&path).unwrap();

    let err = CacheStore::load(&path).unwrap_err();
    match err {
        CacheError::Io { op, .. } => assert_eq!(op, CacheOp::Load),
        other => panic!("expected io error, got {other}"),
    }
}
