#![forbid(unsafe_code)]

// `storage_path` is relative to the attachment root and unique: a file belongs to one row.
pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS form_attachments (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          form_id INTEGER NOT NULL,
          storage_path TEXT NOT NULL UNIQUE,
          created_at TEXT NOT NULL,
          FOREIGN KEY(form_id) REFERENCES formularios_prueba(id) ON DELETE CASCADE
        );
"#;
