#![forbid(unsafe_code)]

use fc_core::ids::RecordId;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STORAGE_DIR: &str = ".formularios";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_ORPHAN_MIN_AGE_S: u64 = 3_600;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SaveArgs {
    pub(crate) task_id: String,
    /// Absent means "now", filled in when the record is saved.
    pub(crate) inspection_date: Option<String>,
    pub(crate) form_code: Option<String>,
    pub(crate) form_name: Option<String>,
    pub(crate) checklist: Vec<(String, String)>,
    pub(crate) comment: String,
    pub(crate) supervisor: String,
    pub(crate) supervisor_area: String,
    pub(crate) brigade: String,
    pub(crate) attachments: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    List,
    Pending,
    Save(SaveArgs),
    Sync,
    Delete(RecordId),
    Sweep { min_age: Option<Duration> },
}

#[derive(Debug)]
pub(crate) struct RunnerConfig {
    pub(crate) storage_dir: PathBuf,
    pub(crate) api_base_url: String,
    pub(crate) api_token: Option<String>,
    pub(crate) http_timeout: Duration,
    pub(crate) orphan_min_age: Duration,
    pub(crate) log_format: LogFormat,
    pub(crate) command: Command,
}

#[derive(Debug)]
pub(crate) enum ParseOutcome {
    Help,
    Run(RunnerConfig),
}

pub(crate) fn usage() -> &'static str {
    "fc_runner — local inspection records: capture, list, sync\n\n\
USAGE:\n\
  fc_runner [--storage-dir DIR] [--api-base-url URL] [--token TOKEN]\n\
            [--http-timeout-ms MS] [--log-format text|json] COMMAND\n\n\
COMMANDS:\n\
  list                      all records, newest first (JSON)\n\
  pending                   unsynced records, oldest first, with count\n\
  save --task ID [--date D (default: now, UTC)] [--code C] [--name N] [--check ITEM=VALUE]...\n\
       [--comment TEXT] [--supervisor S] [--supervisor-area S] [--brigade S]\n\
       [--attach PATH]...\n\
  sync                      submit every unsynced record (requires a token)\n\
  delete ID                 delete a record and its attachment files\n\
  sweep [--min-age-s S]     remove unreferenced attachment files\n\n\
ENVIRONMENT:\n\
  FC_STORAGE_DIR, FC_API_BASE_URL, FC_API_TOKEN, FC_HTTP_TIMEOUT_MS,\n\
  FC_ORPHAN_MIN_AGE_S, FC_LOG_FORMAT; flags win over environment.\n\
  RUST_LOG selects log levels (default: info for fc_* crates).\n"
}

pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_args() -> Result<ParseOutcome, String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    parse_args_from(&args, env_var)
}

pub(crate) fn parse_args_from<E>(args: &[String], env: E) -> Result<ParseOutcome, String>
where
    E: Fn(&str) -> Option<String>,
{
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(ParseOutcome::Help);
    }

    let mut storage_dir: PathBuf = env("FC_STORAGE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
    let mut api_base_url: String =
        env("FC_API_BASE_URL").unwrap_or_else(|| fc_sync::DEFAULT_BASE_URL.to_string());
    let mut api_token: Option<String> = env("FC_API_TOKEN");
    let mut http_timeout_ms: u64 = match env("FC_HTTP_TIMEOUT_MS") {
        Some(v) => v
            .parse()
            .map_err(|_| "FC_HTTP_TIMEOUT_MS must be an integer (milliseconds)")?,
        None => DEFAULT_HTTP_TIMEOUT_MS,
    };
    let orphan_min_age_s: u64 = match env("FC_ORPHAN_MIN_AGE_S") {
        Some(v) => v
            .parse()
            .map_err(|_| "FC_ORPHAN_MIN_AGE_S must be an integer (seconds)")?,
        None => DEFAULT_ORPHAN_MIN_AGE_S,
    };
    let mut log_format: LogFormat = match env("FC_LOG_FORMAT") {
        Some(v) => LogFormat::parse(&v).ok_or("FC_LOG_FORMAT must be text or json")?,
        None => LogFormat::default(),
    };

    let mut rest: Vec<String> = Vec::new();
    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "--storage-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--storage-dir requires DIR")?;
                storage_dir = PathBuf::from(v);
            }
            "--api-base-url" => {
                i += 1;
                let v = args.get(i).ok_or("--api-base-url requires URL")?;
                api_base_url = v.to_string();
            }
            "--token" => {
                i += 1;
                let v = args.get(i).ok_or("--token requires TOKEN")?;
                api_token = Some(v.to_string());
            }
            "--http-timeout-ms" => {
                i += 1;
                let v = args.get(i).ok_or("--http-timeout-ms requires MS")?;
                http_timeout_ms = v
                    .parse::<u64>()
                    .map_err(|_| "--http-timeout-ms must be an integer (milliseconds)")?;
            }
            "--log-format" => {
                i += 1;
                let v = args.get(i).ok_or("--log-format requires text|json")?;
                log_format = LogFormat::parse(v).ok_or("--log-format must be text or json")?;
            }
            _ => rest.push(a.to_string()),
        }
        i += 1;
    }

    if http_timeout_ms == 0 {
        return Err("http timeout must be > 0".to_string());
    }

    let (name, command_args) = rest.split_first().ok_or("missing COMMAND (see --help)")?;
    let command = parse_command(name, command_args)?;

    Ok(ParseOutcome::Run(RunnerConfig {
        storage_dir,
        api_base_url,
        api_token,
        http_timeout: Duration::from_millis(http_timeout_ms),
        orphan_min_age: Duration::from_secs(orphan_min_age_s),
        log_format,
        command,
    }))
}

fn parse_command(name: &str, args: &[String]) -> Result<Command, String> {
    match name {
        "list" => no_args(name, args).map(|()| Command::List),
        "pending" => no_args(name, args).map(|()| Command::Pending),
        "sync" => no_args(name, args).map(|()| Command::Sync),
        "save" => parse_save(args).map(Command::Save),
        "delete" => {
            let [id] = args else {
                return Err("delete requires exactly one ID".to_string());
            };
            let id = id
                .parse::<i64>()
                .map_err(|_| format!("delete: invalid record id: {id}"))?;
            Ok(Command::Delete(RecordId::new(id)))
        }
        "sweep" => match args {
            [] => Ok(Command::Sweep { min_age: None }),
            [flag, v] if flag == "--min-age-s" => {
                let secs = v
                    .parse::<u64>()
                    .map_err(|_| "--min-age-s must be an integer (seconds)")?;
                Ok(Command::Sweep {
                    min_age: Some(Duration::from_secs(secs)),
                })
            }
            _ => Err("sweep accepts only --min-age-s S".to_string()),
        },
        other => Err(format!("unknown command: {other}")),
    }
}

fn no_args(name: &str, args: &[String]) -> Result<(), String> {
    match args.first() {
        None => Ok(()),
        Some(extra) => Err(format!("{name}: unexpected argument: {extra}")),
    }
}

fn parse_save(args: &[String]) -> Result<SaveArgs, String> {
    let mut out = SaveArgs::default();
    let mut task_id: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let v = args
            .get(i)
            .ok_or_else(|| format!("{flag} requires a value"))?
            .to_string();
        match flag {
            "--task" => task_id = Some(v),
            "--date" => out.inspection_date = Some(v),
            "--code" => out.form_code = Some(v),
            "--name" => out.form_name = Some(v),
            "--check" => {
                let (item, value) = v
                    .split_once('=')
                    .ok_or_else(|| format!("--check expects ITEM=VALUE, got {v}"))?;
                out.checklist
                    .push((item.trim().to_string(), value.trim().to_string()));
            }
            "--comment" => out.comment = v,
            "--supervisor" => out.supervisor = v,
            "--supervisor-area" => out.supervisor_area = v,
            "--brigade" => out.brigade = v,
            "--attach" => out.attachments.push(PathBuf::from(v)),
            other => return Err(format!("save: unknown flag: {other}")),
        }
        i += 1;
    }

    out.task_id = task_id
        .filter(|t| !t.trim().is_empty())
        .ok_or("save requires --task ID")?;
    Ok(out)
}
