#![forbid(unsafe_code)]

mod error;
mod requests;
mod support;

pub use error::StoreError;
pub use requests::*;

use crate::attachments::{AttachmentError, AttachmentRef, AttachmentStore, Materialized};
use fc_core::ids::RecordId;
use fc_core::{Attachment, DEFAULT_FORM_CODE, DEFAULT_FORM_NAME, FormRecord, SyncState, parse_checklist};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use support::*;
use tracing::{debug, info, warn};

const DB_FILE: &str = "formularios.db";
const ATTACHMENTS_DIR: &str = "attachments";

/// Local record repository: the record table, its attachment rows and the files behind them.
///
/// Every method takes `&self`; the connection sits behind a mutex so a store shared through an
/// `Arc` serializes mutations while file copies and network calls happen outside the lock.
#[derive(Debug)]
pub struct RecordStore {
    conn: Mutex<Connection>,
    attachments: AttachmentStore,
    storage_dir: PathBuf,
}

impl RecordStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        Self::open_with(
            storage_dir,
            AttachmentStore::new(storage_dir.join(ATTACHMENTS_DIR)),
        )
    }

    pub fn open_with(
        storage_dir: impl AsRef<Path>,
        attachments: AttachmentStore,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        migrate_sqlite_schema(&conn)?;
        info!(db = %db_path.display(), attachments = %attachments.root().display(), "record store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            attachments,
            storage_dir,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn attachment_store(&self) -> &AttachmentStore {
        &self.attachments
    }

    pub fn attachment_path(&self, attachment: &Attachment) -> PathBuf {
        self.attachments
            .resolve(&AttachmentRef::from_stored(attachment.storage_path.as_str()))
    }

    /// Validates, materializes attachments, then inserts the record and its attachment rows in
    /// one transaction. On any failure the files copied by this call are removed again and sources
    /// moved out of transient locations are put back.
    pub fn save(&self, request: SaveRecordRequest) -> Result<RecordId, StoreError> {
        self.save_with(request, |source| self.attachments.materialize(source))
    }

    fn save_with<F>(&self, request: SaveRecordRequest, materialize: F) -> Result<RecordId, StoreError>
    where
        F: Fn(&Path) -> Result<Materialized, AttachmentError>,
    {
        let checklist = parse_checklist(
            request
                .checklist
                .iter()
                .map(|(item, value)| (item.as_str(), value.as_str())),
        )?;

        let mut materialized = Vec::with_capacity(request.attachment_sources.len());
        for source in &request.attachment_sources {
            match materialize(source) {
                Ok(done) => materialized.push(done),
                Err(err) => {
                    warn!(source = %source.display(), error = %err, "save aborted: attachment failure");
                    self.discard_materialized(&materialized);
                    return Err(err.into());
                }
            }
        }

        let created_at = now_timestamp();
        let record = NewRecord {
            task_id: &request.task_id,
            form_code: request.form_code.as_deref().unwrap_or(DEFAULT_FORM_CODE),
            form_name: request.form_name.as_deref().unwrap_or(DEFAULT_FORM_NAME),
            inspection_date: &request.inspection_date,
            checklist: &checklist,
            comment: &request.comment,
            signatures: &request.signatures,
            created_at: &created_at,
        };

        let references: Vec<&AttachmentRef> = materialized.iter().map(|m| &m.reference).collect();
        match self.insert_with_attachments(&record, &references) {
            Ok(record_id) => {
                info!(
                    record_id = %record_id,
                    task_id = %request.task_id,
                    attachments = materialized.len(),
                    "record saved"
                );
                Ok(record_id)
            }
            Err(err) => {
                warn!(task_id = %request.task_id, error = %err, "save aborted: insert failed");
                self.discard_materialized(&materialized);
                Err(err)
            }
        }
    }

    /// All records, newest first.
    pub fn list_all(&self) -> Result<Vec<FormRecord>, StoreError> {
        let conn = self.lock()?;
        query_records(&conn, "ORDER BY created_at DESC, id DESC", [])
    }

    /// Records not yet accepted remotely, oldest first.
    pub fn list_unsynced(&self) -> Result<Vec<FormRecord>, StoreError> {
        let conn = self.lock()?;
        query_records(
            &conn,
            "WHERE COALESCE(synced, 0) = 0 ORDER BY created_at ASC, id ASC",
            [],
        )
    }

    pub fn count_unsynced(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(1) FROM formularios_prueba WHERE COALESCE(synced, 0) = 0",
            [],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count).map_err(|_| StoreError::InvalidRow("negative count"))
    }

    pub fn get(&self, record_id: RecordId) -> Result<Option<FormRecord>, StoreError> {
        let conn = self.lock()?;
        let mut records = query_records(&conn, "WHERE id=?1", params![record_id.get()])?;
        Ok(records.pop())
    }

    /// Moves a record to `Synced`.
    ///
    /// Returns `Ok(true)` on the transition and `Ok(false)` when the record was already synced;
    /// the second call changes nothing, `updated_at` and `remote_id` included.
    pub fn mark_synced(
        &self,
        record_id: RecordId,
        remote_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if sync_state_tx(&tx, record_id)? == SyncState::Synced {
            debug!(record_id = %record_id, "mark_synced: already synced");
            return Ok(false);
        }

        tx.execute(
            "UPDATE formularios_prueba \
             SET synced=1, remote_id=COALESCE(?2, remote_id), updated_at=?3 \
             WHERE id=?1",
            params![record_id.get(), remote_id, now_timestamp()],
        )?;

        tx.commit()?;
        info!(record_id = %record_id, remote_id = ?remote_id, "record marked synced");
        Ok(true)
    }

    /// Deletes the record's files (best effort), then its attachment rows and the record row.
    pub fn delete(&self, record_id: RecordId) -> Result<DeletedRecord, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        sync_state_tx(&tx, record_id)?;
        let attachments = attachments_for_record(&tx, record_id)?;

        let mut outcome = DeletedRecord {
            record_id,
            files_removed: 0,
            files_missing: Vec::new(),
            cleanup_failures: Vec::new(),
        };
        for attachment in attachments {
            let reference = AttachmentRef::from_stored(attachment.storage_path);
            match self.attachments.delete(&reference) {
                Ok(true) => outcome.files_removed += 1,
                Ok(false) => outcome.files_missing.push(reference.into_string()),
                Err(err) => {
                    warn!(
                        record_id = %record_id,
                        storage_path = %reference.as_str(),
                        error = %err,
                        "attachment cleanup failed; file left for the orphan sweep"
                    );
                    outcome.cleanup_failures.push(AttachmentCleanupFailure {
                        storage_path: reference.into_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        delete_attachment_rows_tx(&tx, record_id)?;
        tx.execute(
            "DELETE FROM formularios_prueba WHERE id=?1",
            params![record_id.get()],
        )?;

        tx.commit()?;
        info!(
            record_id = %record_id,
            files_removed = outcome.files_removed,
            files_missing = outcome.files_missing.len(),
            cleanup_failures = outcome.cleanup_failures.len(),
            "record deleted"
        );
        Ok(outcome)
    }

    /// Removes files under the attachment root that no attachment row references.
    ///
    /// Files younger than `min_age` are kept: a concurrent `save` materializes its files before
    /// the rows are committed.
    pub fn sweep_orphans(&self, min_age: Duration) -> Result<SweepReport, StoreError> {
        let conn = self.lock()?;
        let referenced = referenced_storage_paths(&conn)?;
        let files = self.attachments.list_files()?;
        let now = SystemTime::now();

        let mut report = SweepReport::default();
        for file in files {
            if referenced.contains(&file.name) {
                continue;
            }
            let age = file
                .modified
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < min_age {
                report.kept_recent += 1;
                continue;
            }

            let reference = AttachmentRef::from_stored(file.name);
            match self.attachments.delete(&reference) {
                Ok(_) => report.removed.push(reference.into_string()),
                Err(err) => report.failures.push(AttachmentCleanupFailure {
                    storage_path: reference.into_string(),
                    message: err.to_string(),
                }),
            }
        }

        if !report.removed.is_empty() || !report.failures.is_empty() {
            info!(
                removed = report.removed.len(),
                failures = report.failures.len(),
                "orphan attachments swept"
            );
        }
        Ok(report)
    }

    fn insert_with_attachments(
        &self,
        record: &NewRecord<'_>,
        attachments: &[&AttachmentRef],
    ) -> Result<RecordId, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let record_id = insert_record_tx(&tx, record)?;
        for reference in attachments {
            insert_attachment_tx(&tx, record_id, reference.as_str(), record.created_at)?;
        }

        tx.commit()?;
        Ok(record_id)
    }

    fn discard_materialized(&self, materialized: &[Materialized]) {
        for done in materialized {
            if let Err(err) = self.attachments.discard(done) {
                warn!(
                    storage_path = %done.reference.as_str(),
                    error = %err,
                    "failed to roll back materialized attachment"
                );
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests;
