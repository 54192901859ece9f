#![forbid(unsafe_code)]

use fc_storage::{AttachmentError, RecordStore, SaveRecordRequest, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

struct Fixture {
    dir: tempfile::TempDir,
    store: RecordStore,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = RecordStore::open(dir.path().join("store")).expect("open store");
        Self { dir, store }
    }

    fn source(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).expect("write source");
        path
    }

    fn attachment_root(&self) -> &Path {
        self.store.attachment_store().root()
    }

    fn files_on_disk(&self) -> Vec<String> {
        self.store
            .attachment_store()
            .list_files()
            .expect("list files")
            .into_iter()
            .map(|file| file.name)
            .collect()
    }
}

fn request(task_id: &str, sources: Vec<PathBuf>) -> SaveRecordRequest {
    SaveRecordRequest {
        task_id: task_id.to_string(),
        inspection_date: "2024-05-01".to_string(),
        attachment_sources: sources,
        ..SaveRecordRequest::default()
    }
}

#[test]
fn attachments_are_copied_into_the_store() {
    let fx = Fixture::new();
    let first = fx.source("a.jpg", b"first");
    let second = fx.source("b.png", b"second");

    let id = fx
        .store
        .save(request("T-1", vec![first.clone(), second.clone()]))
        .expect("save");
    let record = fx.store.get(id).expect("get").expect("record");

    assert_eq!(record.attachments.len(), 2);
    for attachment in &record.attachments {
        assert_eq!(attachment.record_id, id);
        assert!(!attachment.storage_path.contains('/'));
        let path = fx.store.attachment_path(attachment);
        assert!(path.starts_with(fx.attachment_root()));
        assert!(path.is_file());
    }
    let stored = fs::read(fx.store.attachment_path(&record.attachments[1])).expect("read copy");
    assert_eq!(stored, b"second");
    assert!(first.exists() && second.exists(), "sources stay in place");
}

#[test]
fn unreadable_attachment_rolls_back_the_whole_save() {
    let fx = Fixture::new();
    let good = fx.source("a.jpg", b"ok");
    let missing = fx.dir.path().join("gone.jpg");

    let err = fx
        .store
        .save(request("T-1", vec![good, missing]))
        .expect_err("missing source must fail the save");
    assert!(
        matches!(
            err,
            StoreError::Attachment(AttachmentError::SourceUnreadable { .. })
        ),
        "got {err:?}"
    );

    assert!(fx.store.list_all().expect("list").is_empty());
    assert!(fx.files_on_disk().is_empty(), "copied files are removed again");
}

#[test]
fn delete_removes_rows_and_files() {
    let fx = Fixture::new();
    let id = fx
        .store
        .save(request(
            "T-1",
            vec![fx.source("a.jpg", b"a"), fx.source("b.jpg", b"b")],
        ))
        .expect("save");
    let keep = fx
        .store
        .save(request("T-2", vec![fx.source("c.jpg", b"c")]))
        .expect("save other");

    let deleted = fx.store.delete(id).expect("delete");
    assert_eq!(deleted.record_id, id);
    assert_eq!(deleted.files_removed, 2);
    assert!(deleted.is_clean());

    assert!(fx.store.get(id).expect("get").is_none());
    assert_eq!(fx.files_on_disk().len(), 1);
    assert_eq!(
        fx.store.get(keep).expect("get").expect("kept").attachments.len(),
        1
    );

    assert!(matches!(
        fx.store.delete(id),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn sweep_removes_only_old_unreferenced_files() {
    let fx = Fixture::new();
    let id = fx
        .store
        .save(request("T-1", vec![fx.source("a.jpg", b"a")]))
        .expect("save");
    fs::write(fx.attachment_root().join("stray.jpg"), b"x").expect("write stray");
    fs::write(fx.attachment_root().join("att_1_2_3.jpg.partial"), b"y").expect("write partial");

    let report = fx
        .store
        .sweep_orphans(Duration::from_secs(3600))
        .expect("sweep with grace period");
    assert!(report.removed.is_empty());
    assert_eq!(report.kept_recent, 2);

    let report = fx.store.sweep_orphans(Duration::ZERO).expect("sweep");
    let mut removed = report.removed.clone();
    removed.sort();
    assert_eq!(removed, vec!["att_1_2_3.jpg.partial", "stray.jpg"]);
    assert!(report.failures.is_empty());

    let record = fx.store.get(id).expect("get").expect("record");
    assert!(fx.store.attachment_path(&record.attachments[0]).is_file());
    assert_eq!(fx.files_on_disk().len(), 1);
}
