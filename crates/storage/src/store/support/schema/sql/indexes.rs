#![forbid(unsafe_code)]

pub(crate) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_formularios_synced_created
          ON formularios_prueba(synced, created_at, id);

        CREATE INDEX IF NOT EXISTS idx_formularios_created
          ON formularios_prueba(created_at, id);

        CREATE INDEX IF NOT EXISTS idx_form_attachments_form
          ON form_attachments(form_id, id);
"#;
