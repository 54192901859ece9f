#![forbid(unsafe_code)]

use super::super::super::super::StoreError;
use rusqlite::{Connection, params};

const TABLE: &str = "formularios_prueba";

// Columns added after the first on-device release, with their declarations.
const ADDED_COLUMNS: &[(&str, &str)] = &[("remote_id", "TEXT")];

pub(super) fn apply(conn: &Connection) -> Result<(), StoreError> {
    for (column, decl) in ADDED_COLUMNS {
        if has_column(conn, column)? {
            continue;
        }
        conn.execute_batch(&format!("ALTER TABLE {TABLE} ADD COLUMN {column} {decl};"))?;
        tracing::info!(table = TABLE, column, "schema migration: column added");
    }
    Ok(())
}

fn has_column(conn: &Connection, column: &str) -> Result<bool, StoreError> {
    let found = conn.query_row(
        "SELECT COUNT(1) FROM pragma_table_info(?1) WHERE name = ?2",
        params![TABLE, column],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(found > 0)
}
