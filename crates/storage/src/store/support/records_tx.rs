#![forbid(unsafe_code)]

use super::super::StoreError;
use super::attachments_for_record;
use fc_core::ids::RecordId;
use fc_core::{
    Checklist, ChecklistItem, ChecklistValue, DEFAULT_FORM_CODE, DEFAULT_FORM_NAME, FormRecord,
    Signatures, SyncState,
};
use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, params};

const RECORD_COLUMNS: &str = "id, id_tarea, codigo_formulario, nombre_formulario, fecha_inspeccion, \
     red_seca, red_humeda, comentario, firma_supervisor, firma_supervisor_area, firma_brigada, \
     synced, remote_id, created_at, updated_at";

pub(in crate::store) struct NewRecord<'a> {
    pub(in crate::store) task_id: &'a str,
    pub(in crate::store) form_code: &'a str,
    pub(in crate::store) form_name: &'a str,
    pub(in crate::store) inspection_date: &'a str,
    pub(in crate::store) checklist: &'a Checklist,
    pub(in crate::store) comment: &'a str,
    pub(in crate::store) signatures: &'a Signatures,
    pub(in crate::store) created_at: &'a str,
}

pub(in crate::store) fn insert_record_tx(
    tx: &Transaction<'_>,
    record: &NewRecord<'_>,
) -> Result<RecordId, StoreError> {
    let answer = |item: ChecklistItem| record.checklist.get(&item).map(|value| value.as_str());

    tx.execute(
        "INSERT INTO formularios_prueba(\
           id_tarea, codigo_formulario, nombre_formulario, fecha_inspeccion, \
           red_seca, red_humeda, comentario, \
           firma_supervisor, firma_supervisor_area, firma_brigada, \
           synced, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?11)",
        params![
            record.task_id,
            record.form_code,
            record.form_name,
            record.inspection_date,
            answer(ChecklistItem::RedSeca),
            answer(ChecklistItem::RedHumeda),
            record.comment,
            record.signatures.supervisor,
            record.signatures.supervisor_area,
            record.signatures.brigade,
            record.created_at,
        ],
    )?;

    Ok(RecordId::new(tx.last_insert_rowid()))
}

/// Runs `SELECT <record columns> FROM formularios_prueba <tail>` and loads each record's attachments.
pub(in crate::store) fn query_records<P: Params>(
    conn: &Connection,
    tail: &str,
    params: P,
) -> Result<Vec<FormRecord>, StoreError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM formularios_prueba {tail}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        out.push(record_from_row(row)?);
    }

    for record in &mut out {
        record.attachments = attachments_for_record(conn, record.id)?;
    }

    Ok(out)
}

pub(in crate::store) fn sync_state_tx(
    tx: &Transaction<'_>,
    record_id: RecordId,
) -> Result<SyncState, StoreError> {
    let flag = tx
        .query_row(
            "SELECT synced FROM formularios_prueba WHERE id=?1",
            params![record_id.get()],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()?;

    match flag {
        Some(flag) => Ok(SyncState::from_flag(flag.unwrap_or(0))),
        None => Err(StoreError::NotFound { record_id }),
    }
}

fn record_from_row(row: &Row<'_>) -> Result<FormRecord, StoreError> {
    let mut checklist = Checklist::new();
    let columns = [(5usize, ChecklistItem::RedSeca), (6usize, ChecklistItem::RedHumeda)];
    for (index, item) in columns {
        if let Some(raw) = row.get::<_, Option<String>>(index)? {
            let value = ChecklistValue::parse(&raw)
                .ok_or(StoreError::InvalidRow("checklist value outside domain"))?;
            checklist.insert(item, value);
        }
    }

    Ok(FormRecord {
        id: RecordId::new(row.get::<_, i64>(0)?),
        task_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        form_code: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| DEFAULT_FORM_CODE.to_string()),
        form_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| DEFAULT_FORM_NAME.to_string()),
        inspection_date: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        checklist,
        comment: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        signatures: Signatures {
            supervisor: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            supervisor_area: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            brigade: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        },
        sync_state: SyncState::from_flag(row.get::<_, Option<i64>>(11)?.unwrap_or(0)),
        remote_id: row.get::<_, Option<String>>(12)?,
        created_at: row.get::<_, Option<String>>(13)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(14)?.unwrap_or_default(),
        attachments: Vec::new(),
    })
}
