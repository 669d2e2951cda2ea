use std::process::ExitCode;

use chrono::Utc;

use outage_cli::config::SyncConfig;
use outage_cli::exit_codes::EXIT_SUCCESS;
use outage_cli::{logging, pipeline, CliError};

fn run() -> Result<(), CliError> {
    let config = SyncConfig::load()?;
    let observed_at = Utc::now();
    tracing::info!(%observed_at, database = %config.paths.database.display(), "outage sync starting");

    let summary = pipeline::run(&config, observed_at)?;
    match serde_json::to_string(&summary) {
        Ok(json) => tracing::info!(summary = %json, "run summary"),
        Err(e) => tracing::warn!(error = %e, "cannot serialize run summary"),
    }
    Ok(())
}

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            tracing::error!(code, "{message}");
            eprintln!("error: {}", message);
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
