#![forbid(unsafe_code)]

mod records;

use super::super::super::StoreError;
use rusqlite::Connection;

pub(super) fn apply(conn: &Connection) -> Result<(), StoreError> {
    records::apply(conn)?;
    Ok(())
}
