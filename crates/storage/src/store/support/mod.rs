#![forbid(unsafe_code)]

mod attachments_tx;
mod clock;
mod records_tx;
mod schema;

pub(super) use attachments_tx::*;
pub(super) use clock::now_timestamp;
pub(super) use records_tx::*;
pub(super) use schema::migrate_sqlite_schema;
