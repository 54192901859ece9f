#![forbid(unsafe_code)]

use crate::config::{Command, RunnerConfig, SaveArgs};
use fc_core::Signatures;
use fc_storage::{RecordStore, SaveRecordRequest};
use fc_sync::{Credential, HttpSubmitter, HttpSubmitterConfig, SyncCoordinator, SyncError};
use serde_json::{Value, json};
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;

/// How the process should exit after a command that ran to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Clean,
    /// Some records stayed unsynced or some files could not be cleaned up.
    Partial,
}

pub(crate) fn run(cfg: &RunnerConfig, out: &mut dyn Write) -> Result<Outcome, Box<dyn Error>> {
    let store = Arc::new(RecordStore::open(&cfg.storage_dir)?);

    let (report, outcome) = match &cfg.command {
        Command::List => (json!({ "records": store.list_all()? }), Outcome::Clean),
        Command::Pending => {
            let records = store.list_unsynced()?;
            (
                json!({ "count": records.len(), "records": records }),
                Outcome::Clean,
            )
        }
        Command::Save(args) => {
            let record_id = store.save(save_request(args))?;
            (json!({ "record_id": record_id }), Outcome::Clean)
        }
        Command::Sync => sync(cfg, store)?,
        Command::Delete(record_id) => {
            let deleted = store.delete(*record_id)?;
            let outcome = if deleted.cleanup_failures.is_empty() {
                Outcome::Clean
            } else {
                Outcome::Partial
            };
            let report = json!({
                "record_id": deleted.record_id,
                "files_removed": deleted.files_removed,
                "files_missing": deleted.files_missing,
                "cleanup_failures": cleanup_json(&deleted.cleanup_failures),
            });
            (report, outcome)
        }
        Command::Sweep { min_age } => {
            let report = store.sweep_orphans(min_age.unwrap_or(cfg.orphan_min_age))?;
            let outcome = if report.failures.is_empty() {
                Outcome::Clean
            } else {
                Outcome::Partial
            };
            let json = json!({
                "removed": report.removed,
                "kept_recent": report.kept_recent,
                "failures": cleanup_json(&report.failures),
            });
            (json, outcome)
        }
    };

    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(outcome)
}

fn sync(cfg: &RunnerConfig, store: Arc<RecordStore>) -> Result<(Value, Outcome), Box<dyn Error>> {
    let credential = Credential::try_new(cfg.api_token.clone().unwrap_or_default()).map_err(
        |err| match err {
            SyncError::MissingCredential => {
                Box::<dyn Error>::from("missing credential: set FC_API_TOKEN or pass --token")
            }
            other => Box::<dyn Error>::from(other),
        },
    )?;
    let submitter = HttpSubmitter::new(HttpSubmitterConfig {
        base_url: cfg.api_base_url.clone(),
        timeout: cfg.http_timeout,
    });
    info!(base_url = %submitter.base_url(), "syncing");

    let result = SyncCoordinator::new(store).sync_all(&submitter, &credential)?;
    let outcome = if result.is_complete() {
        Outcome::Clean
    } else {
        Outcome::Partial
    };
    Ok((result.to_json(), outcome))
}

fn save_request(args: &SaveArgs) -> SaveRecordRequest {
    SaveRecordRequest {
        task_id: args.task_id.clone(),
        inspection_date: args
            .inspection_date
            .clone()
            .unwrap_or_else(|| iso8601(OffsetDateTime::now_utc())),
        form_code: args.form_code.clone(),
        form_name: args.form_name.clone(),
        checklist: args.checklist.iter().cloned().collect(),
        comment: args.comment.clone(),
        signatures: Signatures {
            supervisor: args.supervisor.clone(),
            supervisor_area: args.supervisor_area.clone(),
            brigade: args.brigade.clone(),
        },
        attachment_sources: args.attachments.clone(),
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, the inspection date the capture form records when none is picked.
pub(crate) fn iso8601(at: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond()
    )
}

fn cleanup_json(failures: &[fc_storage::AttachmentCleanupFailure]) -> Value {
    Value::Array(
        failures
            .iter()
            .map(|f| json!({ "storage_path": f.storage_path, "message": f.message }))
            .collect(),
    )
}
