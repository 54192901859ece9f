#![forbid(unsafe_code)]

use crate::checklist::Checklist;
use crate::ids::{AttachmentId, RecordId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FORM_CODE: &str = "prueba";
pub const DEFAULT_FORM_NAME: &str = "CONTROL DE SPRINKLERS";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Unsynced,
    Synced,
}

impl SyncState {
    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Self::Unsynced
        } else {
            Self::Synced
        }
    }

    pub fn as_flag(self) -> i64 {
        match self {
            Self::Unsynced => 0,
            Self::Synced => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsynced => "unsynced",
            Self::Synced => "synced",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    pub supervisor: String,
    pub supervisor_area: String,
    pub brigade: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub record_id: RecordId,
    /// Path relative to the attachment root. Immutable once assigned.
    pub storage_path: String,
}

/// One captured inspection form as persisted on the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: RecordId,
    pub task_id: String,
    pub form_code: String,
    pub form_name: String,
    pub inspection_date: String,
    pub checklist: Checklist,
    pub comment: String,
    pub signatures: Signatures,
    pub sync_state: SyncState,
    /// Identifier the remote side returned when it accepted the record.
    pub remote_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub attachments: Vec<Attachment>,
}

impl FormRecord {
    pub fn is_synced(&self) -> bool {
        self.sync_state == SyncState::Synced
    }
}
