use snbackup_core::{
    BackupError, BackupProgress, BackupService, CacheStore, ExportError, FetchOptions,
    IndexProvider, IndexSnapshot, NoteFetcher, NoteRecord, NoteSummary, RemoteError,
    RemoteResult, Timestamp,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// In-memory remote with a scripted index and a fetch log.
#[derive(Default)]
struct FakeRemote {
    notes: BTreeMap<String, NoteRecord>,
    order: Vec<String>,
    fail_on: Option<String>,
    fetched: RefCell<Vec<String>>,
}

impl FakeRemote {
    fn with_notes(entries: &[(&str, i64)]) -> Self {
        let mut remote = Self::default();
        for (key, syncnum) in entries {
            remote.upsert(key, *syncnum);
        }
        remote
    }

    fn upsert(&mut self, key: &str, syncnum: i64) {
        let mut record = NoteRecord::new(key, syncnum);
        record.content = format!("{key} at {syncnum}");
        record.createdate = Some(Timestamp::parse("1483574400").unwrap());
        record.modifydate = Some(Timestamp::parse("1483626600").unwrap());
        if !self.order.iter().any(|existing| existing == key) {
            self.order.push(key.to_string());
        }
        self.notes.insert(key.to_string(), record);
    }

    fn remove(&mut self, key: &str) {
        self.notes.remove(key);
        self.order.retain(|existing| existing != key);
    }

    fn take_fetch_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.fetched.borrow_mut())
    }
}

impl IndexProvider for FakeRemote {
    fn fetch_index(&self) -> RemoteResult<IndexSnapshot> {
        Ok(IndexSnapshot::complete(
            self.order
                .iter()
                .map(|key| NoteSummary::new(key.clone(), self.notes[key].syncnum))
                .collect(),
        ))
    }
}

impl NoteFetcher for FakeRemote {
    fn fetch_note(&self, key: &str) -> RemoteResult<NoteRecord> {
        if self.fail_on.as_deref() == Some(key) {
            return Err(RemoteError::Http {
                endpoint: "data".to_string(),
                status: 500,
            });
        }
        self.fetched.borrow_mut().push(key.to_string());
        self.notes.get(key).cloned().ok_or(RemoteError::Http {
            endpoint: "data".to_string(),
            status: 404,
        })
    }
}

struct Workspace {
    _dir: tempfile::TempDir,
    cache_path: PathBuf,
    export_path: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            cache_path: dir.path().join("data").join("notes_cache.json"),
            export_path: dir.path().join("simplenotebak.json.txt"),
            _dir: dir,
        }
    }

    fn run(&self, remote: &FakeRemote, every: usize) -> Result<snbackup_core::BackupReport, BackupError> {
        let mut cache = CacheStore::load(&self.cache_path).unwrap();
        BackupService::new(remote, FetchOptions { checkpoint_every: every })
            .run(&mut cache, &self.export_path, |_| {})
    }
}

fn exported_keys(path: &Path) -> Vec<String> {
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|note| note["key"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn first_run_fetches_everything_and_exports() {
    let workspace = Workspace::new();
    let remote = FakeRemote::with_notes(&[("a", 1), ("b", 4), ("c", 2)]);
    let mut events = Vec::new();

    let mut cache = CacheStore::load(&workspace.cache_path).unwrap();
    let report = BackupService::new(&remote, FetchOptions::default())
        .run(&mut cache, &workspace.export_path, |event| events.push(event))
        .unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.exported, 3);
    assert!(report.index_complete);
    assert_eq!(remote.take_fetch_log(), vec!["a", "b", "c"]);
    assert_eq!(exported_keys(&workspace.export_path), vec!["a", "b", "c"]);
    assert_eq!(
        events.first(),
        Some(&BackupProgress::IndexFetched {
            notes: 3,
            complete: true
        })
    );
    assert_eq!(
        events.last(),
        Some(&BackupProgress::NoteFetched { done: 3, total: 3 })
    );
}

#[test]
fn rerun_only_fetches_changes_and_drops_removed_notes() {
    let workspace = Workspace::new();
    let mut remote = FakeRemote::with_notes(&[("a", 1), ("b", 1), ("c", 1)]);
    workspace.run(&remote, 50).unwrap();
    remote.take_fetch_log();

    let unchanged = workspace.run(&remote, 50).unwrap();
    assert_eq!(unchanged.fetched, 0);
    assert!(remote.take_fetch_log().is_empty());

    remote.upsert("b", 2);
    remote.remove("c");
    remote.upsert("d", 1);
    let report = workspace.run(&remote, 50).unwrap();

    assert_eq!(report.evicted, 1);
    assert_eq!(remote.take_fetch_log(), vec!["b", "d"]);
    let cache = CacheStore::load(&workspace.cache_path).unwrap();
    assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["a", "b", "d"]);
    assert_eq!(cache.get("b").map(|record| record.syncnum), Some(2));
    assert_eq!(exported_keys(&workspace.export_path), vec!["a", "b", "d"]);
}

#[test]
fn interrupted_run_resumes_from_last_checkpoint() {
    let workspace = Workspace::new();
    let mut remote = FakeRemote::with_notes(&[("n1", 1), ("n2", 1), ("n3", 1), ("n4", 1), ("n5", 1)]);
    remote.fail_on = Some("n4".to_string());

    let err = workspace.run(&remote, 2).unwrap_err();
    assert!(matches!(err, BackupError::Remote(RemoteError::Http { status: 500, .. })));
    assert_eq!(err.exit_code(), 1);
    assert!(!workspace.export_path.exists());

    let on_disk = CacheStore::load(&workspace.cache_path).unwrap();
    assert_eq!(on_disk.keys().collect::<Vec<_>>(), vec!["n1", "n2"]);

    remote.fail_on = None;
    remote.take_fetch_log();
    let report = workspace.run(&remote, 2).unwrap();
    assert_eq!(remote.take_fetch_log(), vec!["n3", "n4", "n5"]);
    assert_eq!(report.exported, 5);
}

#[test]
fn deleted_notes_stay_cached_but_are_not_exported() {
    let workspace = Workspace::new();
    let mut remote = FakeRemote::with_notes(&[("live", 1), ("trashed", 3)]);
    if let Some(record) = remote.notes.get_mut("trashed") {
        record.deleted = true;
    }

    let report = workspace.run(&remote, 50).unwrap();

    assert_eq!(report.skipped_deleted, 1);
    assert_eq!(exported_keys(&workspace.export_path), vec!["live"]);
    assert!(CacheStore::load(&workspace.cache_path)
        .unwrap()
        .contains("trashed"));
}

#[test]
fn export_failure_keeps_the_saved_cache() {
    let workspace = Workspace::new();
    let mut remote = FakeRemote::with_notes(&[("ok", 1), ("undated", 1)]);
    if let Some(record) = remote.notes.get_mut("undated") {
        record.createdate = None;
    }

    let err = workspace.run(&remote, 50).unwrap_err();

    assert!(matches!(
        err,
        BackupError::Export(ExportError::MissingField {
            field: "createdate",
            ..
        })
    ));
    assert_eq!(err.code(), "export_error");
    assert_eq!(CacheStore::load(&workspace.cache_path).unwrap().len(), 2);
}
