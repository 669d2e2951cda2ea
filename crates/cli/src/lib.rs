//! `outage-cli`: the `outage-sync` scheduled job.
//!
//! Scrapes the DOM, AEP and co-op outage feeds, writes the audit CSV and
//! reconciles the SQLite keyed stores. The binary takes no arguments;
//! everything comes from `outage.toml` (see [`config`]).

pub mod config;
pub mod exit_codes;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod window;

use std::fmt;

use config::ConfigError;
use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_SCRAPE, EXIT_URL_NOT_FOUND};
use fetch::FetchError;

/// Top-level failure: message, exit code, optional hint.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::UrlNotFound { .. } => Self {
                code: EXIT_URL_NOT_FOUND,
                message: err.to_string(),
                hint: Some("the provider may be late publishing; the next scheduled run will retry".into()),
            },
            FetchError::Client(_) => Self::general(err.to_string()),
            FetchError::Parse { .. } => Self {
                code: EXIT_SCRAPE,
                message: err.to_string(),
                hint: Some("the provider payload layout may have changed".into()),
            },
            FetchError::Transport { .. } | FetchError::Status { .. } => Self {
                code: EXIT_SCRAPE,
                message: err.to_string(),
                hint: None,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self {
            code: EXIT_CONFIG,
            message: err.to_string(),
            hint: Some(format!("set {} to an outage.toml path", config::CONFIG_ENV)),
        }
    }
}
