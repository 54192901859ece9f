#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;
use std::collections::BTreeMap;

fn open_temp() -> (tempfile::TempDir, RecordStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = RecordStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn request(task_id: &str) -> SaveRecordRequest {
    SaveRecordRequest {
        task_id: task_id.to_string(),
        inspection_date: "2024-05-01".to_string(),
        ..SaveRecordRequest::default()
    }
}

#[test]
fn schema_version_is_recorded() {
    let (_dir, store) = open_temp();
    let conn = store.lock().expect("lock");
    let version: String = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("schema version");
    assert_eq!(version, "2");
}

#[test]
fn empty_checklist_answers_are_stored_as_null() {
    let (_dir, store) = open_temp();
    let mut checklist = BTreeMap::new();
    checklist.insert("red_seca".to_string(), "SI".to_string());
    checklist.insert("red_humeda".to_string(), String::new());
    let id = store
        .save(SaveRecordRequest {
            checklist,
            ..request("T-1")
        })
        .expect("save");

    let conn = store.lock().expect("lock");
    let (seca, humeda): (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT red_seca, red_humeda FROM formularios_prueba WHERE id=?1",
            params![id.get()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("row");
    assert_eq!(seca.as_deref(), Some("SI"));
    assert_eq!(humeda, None);
}

#[test]
fn out_of_domain_value_in_table_is_reported_as_invalid_row() {
    let (_dir, store) = open_temp();
    let id = store.save(request("T-1")).expect("save");
    {
        let conn = store.lock().expect("lock");
        conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
            .expect("disable checks");
        conn.execute(
            "UPDATE formularios_prueba SET red_seca='MAYBE' WHERE id=?1",
            params![id.get()],
        )
        .expect("corrupt row");
    }

    match store.get(id) {
        Err(StoreError::InvalidRow(_)) => {}
        other => panic!("expected InvalidRow, got {other:?}"),
    }
}

#[test]
fn defaults_fill_form_code_and_name() {
    let (_dir, store) = open_temp();
    let id = store.save(request("T-1")).expect("save");
    let record = store.get(id).expect("get").expect("record");
    assert_eq!(record.form_code, fc_core::DEFAULT_FORM_CODE);
    assert_eq!(record.form_name, fc_core::DEFAULT_FORM_NAME);
    assert_eq!(record.created_at, record.updated_at);
}

#[test]
fn mark_synced_keeps_existing_remote_id_when_none_given() {
    let (_dir, store) = open_temp();
    let id = store.save(request("T-1")).expect("save");
    {
        let conn = store.lock().expect("lock");
        conn.execute(
            "UPDATE formularios_prueba SET remote_id='srv-9' WHERE id=?1",
            params![id.get()],
        )
        .expect("seed remote id");
    }

    assert!(store.mark_synced(id, None).expect("mark"));
    let record = store.get(id).expect("get").expect("record");
    assert_eq!(record.remote_id.as_deref(), Some("srv-9"));
}

#[test]
fn deleting_a_record_with_missing_files_reports_them() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("photo.png");
    std::fs::write(&source, b"png").expect("write source");
    let store = RecordStore::open(dir.path().join("store")).expect("open store");

    let id = store
        .save(SaveRecordRequest {
            attachment_sources: vec![source],
            ..request("T-1")
        })
        .expect("save");
    let record = store.get(id).expect("get").expect("record");
    std::fs::remove_file(store.attachment_path(&record.attachments[0])).expect("remove file");

    let deleted = store.delete(id).expect("delete");
    assert_eq!(deleted.files_removed, 0);
    assert_eq!(
        deleted.files_missing,
        vec![record.attachments[0].storage_path.clone()]
    );
    assert!(!deleted.is_clean());
    assert!(store.get(id).expect("get").is_none());
}

#[test]
fn failed_save_returns_moved_sources_to_their_location() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = dir.path().join("cache");
    std::fs::create_dir_all(&cache).expect("create cache");
    let moved = cache.join("capture.jpg");
    std::fs::write(&moved, b"single use").expect("write capture");
    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, b"unused").expect("write broken");
    let store = RecordStore::open(dir.path().join("store")).expect("open store");

    let err = store
        .save_with(
            SaveRecordRequest {
                attachment_sources: vec![moved.clone(), broken.clone()],
                ..request("T-1")
            },
            |source| {
                store.attachments.materialize_with(source, |path, _| {
                    Err(AttachmentError::SourceUnreadable {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::PermissionDenied,
                            "revoked",
                        ),
                    })
                })
            },
        )
        .expect_err("second attachment fails");

    assert!(matches!(err, StoreError::Attachment(_)), "{err:?}");
    assert_eq!(std::fs::read(&moved).expect("capture restored"), b"single use");
    assert!(broken.exists());
    assert!(store.attachments.list_files().expect("list").is_empty());
    assert!(store.list_all().expect("list").is_empty());
}
