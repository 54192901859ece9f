#![forbid(unsafe_code)]

//! Installs the global `tracing` subscriber: `RUST_LOG` filter, stderr output, JSON on request.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "fc_runner=info,fc_sync=info,fc_storage=info";

pub(crate) fn init(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    // A second init (tests) is a no-op.
    match format {
        LogFormat::Json => {
            let _ = subscriber.json().try_init();
        }
        LogFormat::Text => {
            let _ = subscriber.try_init();
        }
    }
}
