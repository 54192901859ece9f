#![forbid(unsafe_code)]

use crate::submitter::{
    AttachmentPayload, RemoteAck, RemoteSubmitter, SubmitError, SubmitErrorKind, Submission,
};
use fc_core::{ChecklistItem, FormRecord};
use serde_json::{Value, json};
use std::io::Read as _;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://10.0.2.2:4000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const UPLOAD_PATH: &str = "/upload";
const FORM_PATH: &str = "/formulario/prueba";
const MAX_ERROR_BODY_CHARS: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpSubmitterConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for HttpSubmitterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Submits records to the inspection backend over HTTP.
///
/// Attachments are uploaded one by one first; the record JSON follows, listing the uploaded file
/// names. Every request carries the bearer token and an `Idempotency-Key`.
pub struct HttpSubmitter {
    agent: ureq::Agent,
    base_url: String,
}

impl std::fmt::Debug for HttpSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSubmitter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpSubmitter {
    pub fn new(config: HttpSubmitterConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn upload(
        &self,
        token: &str,
        key: &str,
        attachment: AttachmentPayload,
    ) -> Result<(), SubmitError> {
        let AttachmentPayload {
            name,
            path,
            len,
            mut file,
        } = attachment;

        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.read_to_end(&mut bytes).map_err(|err| {
            SubmitError::new(
                SubmitErrorKind::Payload,
                format!("read {}: {err}", path.display()),
            )
        })?;

        self.agent
            .post(&self.url(UPLOAD_PATH))
            .set("Authorization", &format!("Bearer {token}"))
            .set("Idempotency-Key", key)
            .set("X-File-Name", &name)
            .set("Content-Type", content_type_for(&name))
            .send_bytes(&bytes)
            .map_err(map_ureq_error)?;

        debug!(file = %name, bytes = bytes.len(), "attachment uploaded");
        Ok(())
    }
}

impl Default for HttpSubmitter {
    fn default() -> Self {
        Self::new(HttpSubmitterConfig::default())
    }
}

impl RemoteSubmitter for HttpSubmitter {
    fn submit(&self, submission: Submission<'_>) -> Result<RemoteAck, SubmitError> {
        let Submission {
            record,
            attachments,
            credential,
            idempotency_key,
        } = submission;
        let token = credential.token();

        let names: Vec<String> = attachments.iter().map(|a| a.name.clone()).collect();
        for (index, attachment) in attachments.into_iter().enumerate() {
            self.upload(token, &format!("{idempotency_key}:{index}"), attachment)?;
        }

        let response = self
            .agent
            .post(&self.url(FORM_PATH))
            .set("Authorization", &format!("Bearer {token}"))
            .set("Idempotency-Key", &idempotency_key)
            .send_json(record_body(record, &names))
            .map_err(map_ureq_error)?;

        let status = response.status();
        let body = response.into_string().map_err(|err| {
            SubmitError::new(
                SubmitErrorKind::InvalidResponse,
                format!("read response body: {err}"),
            )
            .with_status(status)
        })?;

        Ok(RemoteAck {
            server_id: server_id_from_body(&body),
        })
    }
}

/// Record body in the shape the backend has always accepted.
pub fn record_body(record: &FormRecord, attachment_names: &[String]) -> Value {
    let answer = |item: ChecklistItem| {
        record
            .checklist
            .get(&item)
            .map_or(Value::Null, |value| Value::from(value.as_str()))
    };

    json!({
        "id_tarea": record.task_id,
        "codigo_formulario": record.form_code,
        "nombre_formulario": record.form_name,
        "fecha_inspeccion": record.inspection_date,
        "checklist": {
            "red_seca": answer(ChecklistItem::RedSeca),
            "red_humeda": answer(ChecklistItem::RedHumeda),
        },
        "comentario": record.comment,
        "firmas": {
            "supervisor": record.signatures.supervisor,
            "supervisor_area": record.signatures.supervisor_area,
            "brigada": record.signatures.brigade,
        },
        "adjuntos": attachment_names,
    })
}

// Accepts `{"id": ..}` or `{"data": {"id": ..}}`, numeric or string. Anything else is still an
// acceptance, just without a server id.
fn server_id_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let id = value
        .get("id")
        .or_else(|| value.get("data").and_then(|data| data.get("id")))?;
    match id {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn map_ureq_error(err: ureq::Error) -> SubmitError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = error_message_from_body(&body)
                .unwrap_or_else(|| format!("HTTP {status}"));
            let kind = if status == 401 || status == 403 {
                SubmitErrorKind::Unauthorized
            } else {
                SubmitErrorKind::Rejected
            };
            SubmitError::new(kind, message).with_status(status)
        }
        ureq::Error::Transport(transport) => {
            SubmitError::new(SubmitErrorKind::Transport, transport.to_string())
        }
    }
}

fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)?
        .trim();
    if message.is_empty() {
        return None;
    }
    Some(message.chars().take(MAX_ERROR_BODY_CHARS).collect())
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
