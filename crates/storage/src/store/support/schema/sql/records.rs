#![forbid(unsafe_code)]

// Table and column names are shared with databases already on devices; do not rename.
pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS formularios_prueba (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          id_tarea TEXT,
          codigo_formulario TEXT DEFAULT 'prueba',
          nombre_formulario TEXT DEFAULT 'CONTROL DE SPRINKLERS',
          fecha_inspeccion TEXT,

          red_seca TEXT CHECK(red_seca IN ('SI', 'NO', 'N/A', 'OP', 'NOP', 'OB')),
          red_humeda TEXT CHECK(red_humeda IN ('SI', 'NO', 'N/A', 'OP', 'NOP', 'OB')),

          comentario TEXT,

          firma_supervisor TEXT,
          firma_supervisor_area TEXT,
          firma_brigada TEXT,

          synced INTEGER DEFAULT 0,
          remote_id TEXT,
          created_at TEXT DEFAULT (datetime('now', 'localtime')),
          updated_at TEXT DEFAULT (datetime('now', 'localtime'))
        );
"#;
