#![forbid(unsafe_code)]

use fc_core::ids::RecordId;
use fc_core::{ChecklistItem, ChecklistValue, Signatures, SyncState};
use fc_storage::{RecordStore, SaveRecordRequest, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

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

fn checklist(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(item, value)| (item.to_string(), value.to_string()))
        .collect()
}

#[test]
fn saved_record_round_trips_every_field() {
    let (_dir, store) = open_temp();
    let id = store
        .save(SaveRecordRequest {
            task_id: "T-100".to_string(),
            inspection_date: "2024-05-01".to_string(),
            form_code: Some("sprinklers".to_string()),
            form_name: Some("Monthly sprinkler check".to_string()),
            checklist: checklist(&[("red_seca", "SI"), ("red_humeda", "NOP")]),
            comment: "valve 3 leaking".to_string(),
            signatures: Signatures {
                supervisor: "Ana".to_string(),
                supervisor_area: "Luis".to_string(),
                brigade: "Brigada 2".to_string(),
            },
            attachment_sources: Vec::new(),
        })
        .expect("save");

    let record = store.get(id).expect("get").expect("record exists");
    assert_eq!(record.id, id);
    assert_eq!(record.task_id, "T-100");
    assert_eq!(record.inspection_date, "2024-05-01");
    assert_eq!(record.form_code, "sprinklers");
    assert_eq!(record.form_name, "Monthly sprinkler check");
    assert_eq!(
        record.checklist.get(&ChecklistItem::RedSeca),
        Some(&ChecklistValue::Si)
    );
    assert_eq!(
        record.checklist.get(&ChecklistItem::RedHumeda),
        Some(&ChecklistValue::NotOperative)
    );
    assert_eq!(record.comment, "valve 3 leaking");
    assert_eq!(
        record.signatures,
        Signatures {
            supervisor: "Ana".to_string(),
            supervisor_area: "Luis".to_string(),
            brigade: "Brigada 2".to_string(),
        }
    );
    assert_eq!(record.sync_state, SyncState::Unsynced);
    assert_eq!(record.remote_id, None);
    assert!(record.attachments.is_empty());
}

#[test]
fn new_records_start_unsynced() {
    let (_dir, store) = open_temp();
    let id = store.save(request("T-1")).expect("save");

    let pending = store.list_unsynced().expect("list unsynced");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(store.count_unsynced().expect("count"), 1);
}

#[test]
fn invalid_checklist_value_persists_nothing() {
    let (_dir, store) = open_temp();
    let err = store
        .save(SaveRecordRequest {
            checklist: checklist(&[("red_seca", "YES")]),
            ..request("T-1")
        })
        .expect_err("invalid value must be rejected");
    assert!(matches!(err, StoreError::Validation(_)), "got {err:?}");

    let err = store
        .save(SaveRecordRequest {
            checklist: checklist(&[("red_gas", "SI")]),
            ..request("T-1")
        })
        .expect_err("unknown item must be rejected");
    assert!(matches!(err, StoreError::Validation(_)), "got {err:?}");

    let err = store
        .save(SaveRecordRequest {
            checklist: checklist(&[("red_humeda", "   ")]),
            ..request("T-1")
        })
        .expect_err("blank answer is not an unanswered item");
    assert!(matches!(err, StoreError::Validation(_)), "got {err:?}");

    assert!(store.list_all().expect("list").is_empty());
}

#[test]
fn empty_inspection_date_is_stored_verbatim() {
    let (_dir, store) = open_temp();
    let id = store
        .save(SaveRecordRequest {
            inspection_date: String::new(),
            ..request("T-1")
        })
        .expect("save");
    let record = store.get(id).expect("get").expect("record");
    assert_eq!(record.inspection_date, "");
}

#[test]
fn list_all_is_newest_first_and_unsynced_is_oldest_first() {
    let (_dir, store) = open_temp();
    let first = store.save(request("T-1")).expect("save 1");
    let second = store.save(request("T-2")).expect("save 2");
    let third = store.save(request("T-3")).expect("save 3");

    let all: Vec<RecordId> = store
        .list_all()
        .expect("list all")
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(all, vec![third, second, first]);

    store.mark_synced(second, Some("srv-2")).expect("mark");
    let pending: Vec<RecordId> = store
        .list_unsynced()
        .expect("list unsynced")
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(pending, vec![first, third]);
}

#[test]
fn mark_synced_twice_is_a_no_op() {
    let (_dir, store) = open_temp();
    let id = store.save(request("T-1")).expect("save");

    assert!(store.mark_synced(id, Some("srv-1")).expect("first mark"));
    let after_first = store.get(id).expect("get").expect("record");
    assert!(after_first.is_synced());
    assert_eq!(after_first.remote_id.as_deref(), Some("srv-1"));

    assert!(!store.mark_synced(id, Some("srv-other")).expect("second mark"));
    let after_second = store.get(id).expect("get").expect("record");
    assert_eq!(after_second, after_first);
    assert_eq!(store.count_unsynced().expect("count"), 0);
}

#[test]
fn unknown_ids_are_not_found() {
    let (_dir, store) = open_temp();
    let missing = RecordId::new(42);

    assert!(store.get(missing).expect("get").is_none());
    assert!(matches!(
        store.mark_synced(missing, None),
        Err(StoreError::NotFound { record_id }) if record_id == missing
    ));
    assert!(matches!(
        store.delete(missing),
        Err(StoreError::NotFound { record_id }) if record_id == missing
    ));
}

#[test]
fn ids_are_not_reused_after_delete() {
    let (_dir, store) = open_temp();
    let first = store.save(request("T-1")).expect("save");
    store.delete(first).expect("delete");
    let second = store.save(request("T-2")).expect("save again");
    assert!(second > first);
}

#[test]
fn concurrent_saves_from_shared_store_all_land() {
    let (_dir, store) = open_temp();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..5 {
                    store
                        .save(request(&format!("T-{n}-{i}")))
                        .expect("save from thread");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let all = store.list_all().expect("list");
    assert_eq!(all.len(), 40);
    let mut ids: Vec<RecordId> = all.iter().map(|record| record.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
}

#[test]
fn reopening_the_store_keeps_records() {
    let dir = tempfile::tempdir().expect("temp dir");
    let id = {
        let store = RecordStore::open(dir.path()).expect("open store");
        let id = store.save(request("T-1")).expect("save");
        store.mark_synced(id, Some("srv-1")).expect("mark");
        id
    };

    let store = RecordStore::open(dir.path()).expect("reopen store");
    let record = store.get(id).expect("get").expect("record");
    assert!(record.is_synced());
    assert_eq!(record.remote_id.as_deref(), Some("srv-1"));
}
