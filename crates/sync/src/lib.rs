#![forbid(unsafe_code)]

//! Reconciles locally captured records with the remote authority.

mod cancel;
mod coordinator;
mod http;
mod submitter;

pub use cancel::CancellationToken;
pub use coordinator::{BatchResult, RecordFailure, SyncCoordinator, SyncError, SyncFailure};
pub use http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpSubmitter, HttpSubmitterConfig, record_body};
pub use submitter::{
    AttachmentPayload, Credential, RemoteAck, RemoteSubmitter, SubmitError, SubmitErrorKind,
    Submission, idempotency_key,
};
