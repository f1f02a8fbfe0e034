use dropzone::error::UploadError;
use dropzone::kv::{FileKv, KvStore, MemoryKv};
use dropzone::models::{Session, UploadRecord, UploadStatus};
use dropzone::store::{HistoryStore, SessionStore, HISTORY_KEY, SESSIONS_KEY};
use std::sync::Arc;

fn record(id: &str, status: UploadStatus) -> UploadRecord {
    let base = UploadRecord {
        id: id.to_string(),
        name: format!("{}.png", id),
        size: 2048,
        mime_type: "image/png".to_string(),
        status: UploadStatus::Pending,
        progress: 0.0,
        upload_speed: 0.0,
        share_link: String::new(),
        thumbnail_ref: None,
        uploaded_at: "2024-05-01T10:00:00+00:00".to_string(),
    };
    match status {
        UploadStatus::Pending => base,
        UploadStatus::Uploading => base.start_attempt().advance(42.5, 2.5),
        UploadStatus::Completed => base.complete(format!("https://dropzone.pro/file/{}", id)),
        UploadStatus::Error => base.fail(),
    }
}

#[test]
fn test_save_then_load_round_trips() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(FileKv::new(temp_dir.path(), 1024 * 1024));
    let store = HistoryStore::history(kv);

    let records = vec![
        record("file-1", UploadStatus::Pending),
        record("file-2", UploadStatus::Uploading),
        record("file-3", UploadStatus::Completed),
        record("file-4", UploadStatus::Error),
    ];
    store.save(&records);

    assert_eq!(store.load(), records);
    assert!(temp_dir.path().join(format!("{}.json", HISTORY_KEY)).exists());
}

#[test]
fn test_load_absent_is_empty() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(FileKv::new(temp_dir.path().join("missing"), 1024));
    let store = HistoryStore::history(kv);

    assert!(store.load().is_empty());
}

#[test]
fn test_load_corrupt_is_empty() {
    let kv = Arc::new(MemoryKv::new());
    kv.set(HISTORY_KEY, "{not json at all").unwrap();
    let store = HistoryStore::history(kv.clone());
    assert!(store.load().is_empty());

    // valid json, wrong shape
    kv.set(HISTORY_KEY, r#"{"id":"file-1"}"#).unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn test_thumbnail_is_not_persisted() {
    let kv = Arc::new(MemoryKv::new());
    let store = HistoryStore::history(kv.clone());

    let mut with_thumb = record("file-1", UploadStatus::Pending);
    with_thumb.thumbnail_ref = Some("blob:preview-1".to_string());
    store.save(&[with_thumb]);

    let raw = kv.get(HISTORY_KEY).unwrap().unwrap();
    assert!(!raw.contains("thumbnail"));
    assert!(raw.contains("\"mimeType\":\"image/png\""));
    assert!(raw.contains("\"status\":\"pending\""));
    assert_eq!(store.load()[0].thumbnail_ref, None);
}

#[test]
fn test_quota_failure_is_swallowed() {
    let kv = Arc::new(MemoryKv::with_quota(64));
    let store = HistoryStore::history(kv);

    let small: Vec<UploadRecord> = Vec::new();
    store.save(&small);
    assert!(store.load().is_empty());

    // way over 64 bytes; must not panic, previous snapshot stays
    store.save(&[record("file-1", UploadStatus::Completed)]);
    assert!(store.load().is_empty());
}

#[test]
fn test_file_quota_counts_other_keys() {
    let temp_dir = tempfile::tempdir().unwrap();
    let kv = FileKv::new(temp_dir.path(), 10);

    kv.set("a", "12345").unwrap();
    // replacing the same key only counts the new value
    kv.set("a", "1234567890").unwrap();
    assert!(kv.set("b", "1").is_err());
    assert_eq!(kv.get("a").unwrap().as_deref(), Some("1234567890"));
    assert_eq!(kv.dir(), temp_dir.path());
}

#[test]
fn test_upsert_and_remove() {
    let kv = Arc::new(MemoryKv::new());
    let store = HistoryStore::history(kv);

    store.upsert(&record("file-1", UploadStatus::Pending));
    store.upsert(&record("file-2", UploadStatus::Pending));
    store.upsert(&record("file-1", UploadStatus::Completed));

    let loaded = store.load();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "file-1");
    assert_eq!(loaded[0].status, UploadStatus::Completed);

    assert_eq!(store.remove("file-1"), Ok(()));
    assert_eq!(
        store.remove("file-1"),
        Err(UploadError::NotFound("file-1".to_string()))
    );
    assert_eq!(store.load().len(), 1);
}

#[test]
fn test_update_merges_into_stored_record() {
    let kv = Arc::new(MemoryKv::new());
    let store = HistoryStore::history(kv);
    store.upsert(&record("file-1", UploadStatus::Pending));
    store.upsert(&record("file-2", UploadStatus::Pending));

    let updated = store
        .update("file-2", |r| *r = r.complete("https://dropzone.pro/file/file-2".to_string()))
        .unwrap();
    assert_eq!(updated.status, UploadStatus::Completed);

    let loaded = store.load();
    assert_eq!(loaded[0].status, UploadStatus::Pending);
    assert_eq!(loaded[1], updated);
}

#[test]
fn test_update_unknown_id_is_not_found() {
    let kv = Arc::new(MemoryKv::new());
    let store = HistoryStore::history(kv.clone());
    store.upsert(&record("file-1", UploadStatus::Pending));

    let result = store.update("file-9", |r| r.progress = 50.0);
    assert_eq!(result, Err(UploadError::NotFound("file-9".to_string())));

    // nothing was inserted for the unknown id
    let loaded = store.load();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "file-1");
}

#[test]
fn test_concurrent_modify_does_not_lose_updates() {
    let kv = Arc::new(MemoryKv::new());
    let store = Arc::new(HistoryStore::history(kv));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                for j in 0..10 {
                    store.upsert(&record(&format!("file-{}-{}", i, j), UploadStatus::Pending));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.load().len(), 80);
}

#[test]
fn test_sessions_live_under_their_own_key() {
    let kv = Arc::new(MemoryKv::new());
    let history = HistoryStore::history(kv.clone());
    let sessions = SessionStore::sessions(kv.clone());
    assert_eq!(sessions.key(), SESSIONS_KEY);

    history.save(&[record("file-1", UploadStatus::Completed)]);
    let session = Session {
        session_id: "session-1".to_string(),
        files: history.load(),
        total_size: 2048,
        completed_size: 2048,
        shareable_link: "https://dropzone.pro/share/abc".to_string(),
        start_time: "2024-05-01T10:00:00+00:00".to_string(),
    };
    sessions.save(&[session.clone()]);

    assert_eq!(sessions.find("session-1"), Some(session));
    assert_eq!(history.load().len(), 1);

    // corrupting one key leaves the other alone
    kv.set(SESSIONS_KEY, "garbage").unwrap();
    assert!(sessions.load().is_empty());
    assert_eq!(history.load().len(), 1);
}
