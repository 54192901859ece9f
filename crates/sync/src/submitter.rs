#![forbid(unsafe_code)]

use crate::SyncError;
use fc_core::FormRecord;
use sha2::Digest as _;
use std::fmt::{self, Write as _};
use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;

/// Opaque bearer credential handed through to the remote side unchanged. Never blank.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn try_new(token: impl Into<String>) -> Result<Self, SyncError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SyncError::MissingCredential);
        }
        Ok(Self(token))
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One attachment opened for reading, resolved from its durable path.
#[derive(Debug)]
pub struct AttachmentPayload {
    /// Durable storage name; stable across retries.
    pub name: String,
    pub path: PathBuf,
    pub len: u64,
    pub file: File,
}

#[derive(Debug)]
pub struct Submission<'a> {
    pub record: &'a FormRecord,
    pub attachments: Vec<AttachmentPayload>,
    pub credential: &'a Credential,
    /// Derived from the record's identity; identical on every resubmission of that record.
    pub idempotency_key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteAck {
    pub server_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitErrorKind {
    /// Network unreachable, connection reset, timeout.
    Transport,
    Unauthorized,
    /// The remote side answered with a non-success status.
    Rejected,
    InvalidResponse,
    /// The payload could not be assembled locally (attachment read failure).
    Payload,
}

impl SubmitErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Unauthorized => "unauthorized",
            Self::Rejected => "rejected",
            Self::InvalidResponse => "invalid_response",
            Self::Payload => "payload",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}: {message}", .kind.as_str())]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl SubmitError {
    pub fn new(kind: SubmitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Remote authority that accepts records.
///
/// Implementations must treat a resubmission with the same idempotency key as a duplicate of the
/// first: a record can be accepted remotely and still be unsynced locally if the process dies
/// before `mark_synced` runs. Timeouts are the implementation's business and surface as
/// `SubmitErrorKind::Transport`.
pub trait RemoteSubmitter {
    fn submit(&self, submission: Submission<'_>) -> Result<RemoteAck, SubmitError>;
}

impl<S: RemoteSubmitter + ?Sized> RemoteSubmitter for &S {
    fn submit(&self, submission: Submission<'_>) -> Result<RemoteAck, SubmitError> {
        (**self).submit(submission)
    }
}

/// Hex SHA-256 of `task_id`, `inspection_date`, `created_at` and the local id, newline-separated.
///
/// Stable for one record across retries; distinct for two inspections of the same task even when
/// they share an inspection date.
pub fn idempotency_key(record: &FormRecord) -> String {
    let mut hasher = sha2::Sha256::new();
    let id = record.id.to_string();
    let parts = [
        record.task_id.as_str(),
        record.inspection_date.as_str(),
        record.created_at.as_str(),
        id.as_str(),
    ];
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            hasher.update(b"\n");
        }
        hasher.update(part.as_bytes());
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
