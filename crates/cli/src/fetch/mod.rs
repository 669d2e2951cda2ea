//! Provider feeds: URL resolution, HTTP transport and payload parsing.
//!
//! Every feed turns one raw payload into [`OutageRecord`]s stamped with
//! the run's shared `observed_at`. Keys are built at parse time so the
//! audit CSV and the provider store see the same join key.

pub mod coop;
pub mod common;
pub mod interval;
pub mod resolve;

use chrono::{DateTime, Utc};
use thiserror::Error;

use outage_recon::OutageRecord;

pub use common::{FetchClient, Probe};
pub use coop::CoopFeed;
pub use interval::{IntervalFeed, IntervalSchema};
pub use resolve::{interval_url, resolve};

#[derive(Debug, Error)]
pub enum FetchError {
    /// Every time-bucket candidate was probed without a 200.
    #[error("{provider}: no published report found after {attempts} candidate URLs")]
    UrlNotFound { provider: String, attempts: usize },

    #[error("{provider}: request to {url} failed: {message}")]
    Transport {
        provider: String,
        url: String,
        message: String,
    },

    #[error("{provider}: {url} returned HTTP {status}")]
    Status {
        provider: String,
        url: String,
        status: u16,
    },

    /// Payload shape did not match what the feed expects.
    #[error("{provider}: cannot parse payload: {message}")]
    Parse { provider: String, message: String },

    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub(crate) fn parse(provider: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Records decoded from one payload, plus how many entries were dropped.
#[derive(Debug, Default)]
pub struct FeedParse {
    pub records: Vec<OutageRecord>,
    /// Entries skipped as malformed. Always 0 for the strict feeds.
    pub skipped: usize,
}

/// A provider payload format.
pub trait ProviderFeed {
    /// Display name, used as the provider half of every join key.
    fn provider(&self) -> &str;

    fn parse(&self, body: &str, observed_at: DateTime<Utc>) -> Result<FeedParse, FetchError>;

    /// GET `url` and parse the body.
    fn fetch(
        &self,
        client: &FetchClient,
        url: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<FeedParse, FetchError> {
        let body = client.get_text(self.provider(), url)?;
        let parsed = self.parse(&body, observed_at)?;
        tracing::info!(
            provider = self.provider(),
            records = parsed.records.len(),
            skipped = parsed.skipped,
            "feed parsed"
        );
        Ok(parsed)
    }
}
