#![forbid(unsafe_code)]

use super::super::StoreError;
use fc_core::Attachment;
use fc_core::ids::{AttachmentId, RecordId};
use rusqlite::{Connection, Transaction, params};
use std::collections::HashSet;

pub(in crate::store) fn insert_attachment_tx(
    tx: &Transaction<'_>,
    record_id: RecordId,
    storage_path: &str,
    created_at: &str,
) -> Result<AttachmentId, StoreError> {
    tx.execute(
        "INSERT INTO form_attachments(form_id, storage_path, created_at) VALUES (?1, ?2, ?3)",
        params![record_id.get(), storage_path, created_at],
    )?;
    Ok(AttachmentId::new(tx.last_insert_rowid()))
}

pub(in crate::store) fn attachments_for_record(
    conn: &Connection,
    record_id: RecordId,
) -> Result<Vec<Attachment>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, storage_path FROM form_attachments WHERE form_id=?1 ORDER BY id ASC",
    )?;
    let mut rows = stmt.query(params![record_id.get()])?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        out.push(Attachment {
            id: AttachmentId::new(row.get::<_, i64>(0)?),
            record_id,
            storage_path: row.get::<_, String>(1)?,
        });
    }

    Ok(out)
}

pub(in crate::store) fn delete_attachment_rows_tx(
    tx: &Transaction<'_>,
    record_id: RecordId,
) -> Result<usize, StoreError> {
    Ok(tx.execute(
        "DELETE FROM form_attachments WHERE form_id=?1",
        params![record_id.get()],
    )?)
}

pub(in crate::store) fn referenced_storage_paths(
    conn: &Connection,
) -> Result<HashSet<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT storage_path FROM form_attachments")?;
    let mut rows = stmt.query([])?;
    let mut out = HashSet::new();

    while let Some(row) = rows.next()? {
        out.insert(row.get::<_, String>(0)?);
    }

    Ok(out)
}
