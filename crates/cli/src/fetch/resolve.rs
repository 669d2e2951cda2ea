//! Find the most recent published report for an interval-generation feed.

use super::{FetchError, Probe};

const INTERVAL_PATH: &str = "resources/data/external/interval_generation_data";

/// `{base}/resources/data/external/interval_generation_data/{bucket}/{report}`
pub fn interval_url(base: &str, bucket: &str, report: &str) -> String {
    format!("{}/{INTERVAL_PATH}/{bucket}/{report}", base.trim_end_matches('/'))
}

/// Probe candidate URLs in order and return the first that answers 200.
///
/// A transport error on one candidate is treated the same as a 404. The
/// candidates are consumed lazily, so nothing past the first hit is probed.
pub fn resolve<P, I>(probe: &P, provider: &str, candidates: I) -> Result<String, FetchError>
where
    P: Probe + ?Sized,
    I: IntoIterator<Item = String>,
{
    let mut attempts = 0;
    for url in candidates {
        attempts += 1;
        match probe.status(provider, &url) {
            Ok(200) => {
                tracing::info!(provider, attempts, url = %url, "report URL resolved");
                return Ok(url);
            }
            Ok(status) => tracing::debug!(provider, status, url = %url, "not published"),
            Err(e) => tracing::debug!(provider, error = %e, url = %url, "probe failed"),
        }
    }
    Err(FetchError::UrlNotFound {
        provider: provider.to_string(),
        attempts,
    })
}
