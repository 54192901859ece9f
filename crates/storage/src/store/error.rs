#![forbid(unsafe_code)]

use crate::attachments::AttachmentError;
use fc_core::ValidationError;
use fc_core::ids::RecordId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("attachment: {0}")]
    Attachment(#[from] AttachmentError),
    #[error("record not found (id={record_id})")]
    NotFound { record_id: RecordId },
    #[error("invalid row: {0}")]
    InvalidRow(&'static str),
    #[error("store lock poisoned")]
    LockPoisoned,
}
