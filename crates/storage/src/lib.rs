#![forbid(unsafe_code)]

//! Device-local persistence for captured inspection forms: a SQLite record table plus a
//! directory of attachment files owned by the store.

mod attachments;
mod store;

pub use attachments::{
    AttachmentError, AttachmentRef, AttachmentStore, DEFAULT_TRANSIENT_MARKERS, Materialized,
    StoredFile,
};
pub use store::*;
