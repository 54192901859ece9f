#![forbid(unsafe_code)]

mod migrations;
mod sql;

use super::super::StoreError;
use rusqlite::{Connection, params};

const SCHEMA_VERSION: &str = "2";

pub(in crate::store) fn migrate_sqlite_schema(conn: &Connection) -> Result<(), StoreError> {
    let journal_mode = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    })?;
    tracing::debug!(journal_mode = %journal_mode, "sqlite journal mode");

    conn.execute_batch(&sql::full_schema_sql())?;

    migrations::apply(conn)?;

    conn.execute_batch(sql::INDEXES)?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params!["schema_version", SCHEMA_VERSION],
    )?;

    Ok(())
}
