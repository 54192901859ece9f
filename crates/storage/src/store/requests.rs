#![forbid(unsafe_code)]

use fc_core::Signatures;
use fc_core::ids::RecordId;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything the capture form hands over on save.
///
/// `checklist` carries raw answers keyed by item name; they are validated before any file is
/// touched. `form_code` / `form_name` fall back to the defaults when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveRecordRequest {
    pub task_id: String,
    pub inspection_date: String,
    pub form_code: Option<String>,
    pub form_name: Option<String>,
    pub checklist: BTreeMap<String, String>,
    pub comment: String,
    pub signatures: Signatures,
    pub attachment_sources: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentCleanupFailure {
    pub storage_path: String,
    pub message: String,
}

/// Outcome of deleting a record. Rows are always gone; file cleanup is reported, not enforced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletedRecord {
    pub record_id: RecordId,
    pub files_removed: usize,
    /// Referenced files that were already missing on disk.
    pub files_missing: Vec<String>,
    pub cleanup_failures: Vec<AttachmentCleanupFailure>,
}

impl DeletedRecord {
    pub fn is_clean(&self) -> bool {
        self.files_missing.is_empty() && self.cleanup_failures.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<String>,
    /// Unreferenced files younger than the requested minimum age.
    pub kept_recent: usize,
    pub failures: Vec<AttachmentCleanupFailure>,
}
