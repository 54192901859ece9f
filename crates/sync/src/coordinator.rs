#![forbid(unsafe_code)]

use crate::cancel::CancellationToken;
use crate::submitter::{
    AttachmentPayload, Credential, RemoteSubmitter, SubmitError, Submission, idempotency_key,
};
use fc_core::FormRecord;
use fc_core::ids::RecordId;
use fc_storage::{RecordStore, StoreError};
use serde_json::{Value, json};
use std::fs::File;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop a batch before any record is submitted.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync already in progress")]
    InProgress,
    #[error("missing credential")]
    MissingCredential,
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Why one record of a batch stayed unsynced.
#[derive(Debug, Error)]
pub enum SyncFailure {
    #[error("submission: {0}")]
    Submission(#[from] SubmitError),
    #[error("attachment missing ({storage_path}): {source}")]
    AttachmentMissing {
        storage_path: String,
        #[source]
        source: io::Error,
    },
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl SyncFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submission(err) => err.kind.as_str(),
            Self::AttachmentMissing { .. } => "attachment_missing",
            Self::Store(StoreError::NotFound { .. }) => "not_found",
            Self::Store(_) => "store",
        }
    }
}

#[derive(Debug)]
pub struct RecordFailure {
    pub record_id: RecordId,
    pub error: SyncFailure,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    /// Size of the unsynced snapshot taken at batch start.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records not attempted because the batch was cancelled.
    pub skipped: usize,
    pub cancelled: bool,
    /// Failures in submission order.
    pub errors: Vec<RecordFailure>,
}

impl BatchResult {
    pub fn summary(&self) -> String {
        format!("{} of {} synced", self.succeeded, self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn to_json(&self) -> Value {
        json!({
            "total": self.total,
            "succeeded": self.succeeded,
            "failed": self.failed,
            "skipped": self.skipped,
            "cancelled": self.cancelled,
            "summary": self.summary(),
            "errors": self.errors.iter().map(|failure| json!({
                "record_id": failure.record_id,
                "kind": failure.error.kind(),
                "message": failure.error.to_string(),
            })).collect::<Vec<_>>(),
        })
    }
}

/// Drives unsynced records through a [`RemoteSubmitter`], one batch at a time.
///
/// The store is shared, so captures can be saved while a batch waits on the network.
#[derive(Debug)]
pub struct SyncCoordinator {
    store: Arc<RecordStore>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SyncError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::InProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncCoordinator {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn sync_all<S>(
        &self,
        submitter: &S,
        credential: &Credential,
    ) -> Result<BatchResult, SyncError>
    where
        S: RemoteSubmitter + ?Sized,
    {
        self.sync_all_with_cancel(submitter, credential, &CancellationToken::new())
    }

    /// Submits every record that was unsynced when the batch started, oldest first.
    ///
    /// A failing record is recorded and skipped; it stays unsynced for the next batch. A second
    /// call while a batch is running fails with [`SyncError::InProgress`].
    pub fn sync_all_with_cancel<S>(
        &self,
        submitter: &S,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, SyncError>
    where
        S: RemoteSubmitter + ?Sized,
    {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let snapshot = self.store.list_unsynced()?;
        let mut result = BatchResult {
            total: snapshot.len(),
            ..BatchResult::default()
        };
        info!(pending = result.total, "sync batch started");

        for (index, record) in snapshot.iter().enumerate() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                result.skipped = result.total - index;
                info!(skipped = result.skipped, "sync batch cancelled");
                break;
            }

            match self.sync_one(submitter, credential, record) {
                Ok(()) => result.succeeded += 1,
                Err(error) => {
                    warn!(
                        record_id = %record.id,
                        task_id = %record.task_id,
                        kind = error.kind(),
                        error = %error,
                        "record left unsynced"
                    );
                    result.failed += 1;
                    result.errors.push(RecordFailure {
                        record_id: record.id,
                        error,
                    });
                }
            }
        }

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "sync batch finished: {}",
            result.summary()
        );
        Ok(result)
    }

    fn sync_one<S>(
        &self,
        submitter: &S,
        credential: &Credential,
        record: &FormRecord,
    ) -> Result<(), SyncFailure>
    where
        S: RemoteSubmitter + ?Sized,
    {
        let attachments = self.open_attachments(record)?;
        let submission = Submission {
            record,
            attachments,
            credential,
            idempotency_key: idempotency_key(record),
        };

        let ack = submitter.submit(submission)?;
        let transitioned = self
            .store
            .mark_synced(record.id, ack.server_id.as_deref())?;
        debug!(
            record_id = %record.id,
            server_id = ?ack.server_id,
            transitioned,
            "record accepted"
        );
        Ok(())
    }

    fn open_attachments(&self, record: &FormRecord) -> Result<Vec<AttachmentPayload>, SyncFailure> {
        let mut out = Vec::with_capacity(record.attachments.len());
        for attachment in &record.attachments {
            let path = self.store.attachment_path(attachment);
            let missing = |source: io::Error| SyncFailure::AttachmentMissing {
                storage_path: attachment.storage_path.clone(),
                source,
            };
            let file = File::open(&path).map_err(missing)?;
            let len = file.metadata().map_err(missing)?.len();
            out.push(AttachmentPayload {
                name: attachment.storage_path.clone(),
                path,
                len,
                file,
            });
        }
        Ok(out)
    }
}
