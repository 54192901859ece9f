#![forbid(unsafe_code)]

mod commands;
mod config;
mod logging;

use commands::Outcome;
use config::ParseOutcome;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cfg = match config::parse_args() {
        Ok(ParseOutcome::Help) => {
            print!("{}", config::usage());
            return ExitCode::SUCCESS;
        }
        Ok(ParseOutcome::Run(cfg)) => cfg,
        Err(e) => {
            eprintln!("{e}\n\n{}", config::usage());
            return ExitCode::from(2);
        }
    };

    logging::init(cfg.log_format);

    let stdout = std::io::stdout();
    match commands::run(&cfg, &mut stdout.lock()) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => ExitCode::from(3),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}
