//! Virginia/Maryland/Delaware electric co-op feed.
//!
//! The payload is a JavaScript file, not JSON:
//!
//! ```text
//! var data = [{...},{...}];
//! var coop_data = {"1":{"company":"...","county":[{"name":"...","outage":5}]}};
//! ```
//!
//! Line one is a company summary and is only logged. Line two carries the
//! per-county counts. A malformed company or county entry is skipped and
//! counted; the rest of the payload still produces records.

use chrono::{DateTime, Utc};
use serde_json::Value;

use outage_recon::OutageRecord;

use super::{FeedParse, FetchError, ProviderFeed};

pub const COOP_FEED_NAME: &str = "Co-op";

#[derive(Debug, Clone, Copy, Default)]
pub struct CoopFeed;

impl CoopFeed {
    pub fn new() -> Self {
        Self
    }
}

/// `var data = [a, b];` -> `{"companies": [a, b]}`
fn summary_json(line: &str) -> String {
    let inner = line
        .trim_end()
        .trim_start_matches("var data = ")
        .trim_end_matches(';')
        .trim();
    let inner = inner.strip_prefix('[').unwrap_or(inner);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    format!("{{\"companies\": [{inner}]}}")
}

/// `var coop_data = {...};` -> `{...}`
fn coop_json(line: &str) -> &str {
    line.trim_end()
        .trim_start_matches("var coop_data = ")
        .trim_end_matches(';')
}

impl ProviderFeed for CoopFeed {
    fn provider(&self) -> &str {
        COOP_FEED_NAME
    }

    fn parse(&self, body: &str, observed_at: DateTime<Utc>) -> Result<FeedParse, FetchError> {
        let mut lines = body.lines().filter(|l| !l.trim().is_empty());
        let (Some(first), Some(second)) = (lines.next(), lines.next()) else {
            return Err(FetchError::parse(COOP_FEED_NAME, "expected two assignment lines"));
        };

        let summary: Value = serde_json::from_str(&summary_json(first))
            .map_err(|e| FetchError::parse(COOP_FEED_NAME, format!("company summary: {e}")))?;
        let companies = summary["companies"].as_array().map_or(0, Vec::len);
        tracing::debug!(companies, "co-op summary");

        let coops: Value = serde_json::from_str(coop_json(second))
            .map_err(|e| FetchError::parse(COOP_FEED_NAME, format!("coop_data: {e}")))?;
        let coops = coops
            .as_object()
            .ok_or_else(|| FetchError::parse(COOP_FEED_NAME, "coop_data is not an object"))?;

        let mut out = FeedParse::default();
        for (id, coop) in coops {
            let Some(company) = coop.get("company").and_then(Value::as_str) else {
                tracing::warn!(entry = %id, "co-op entry without company, skipped");
                out.skipped += 1;
                continue;
            };
            let Some(counties) = coop.get("county").and_then(Value::as_array) else {
                tracing::warn!(entry = %id, company, "co-op entry without county list, skipped");
                out.skipped += 1;
                continue;
            };

            for county in counties {
                let name = county.get("name").and_then(Value::as_str);
                let outage = county.get("outage").and_then(Value::as_u64);
                match (name, outage) {
                    (Some(name), Some(outage)) => {
                        out.records
                            .push(OutageRecord::new(company, name, 0, outage, observed_at));
                    }
                    _ => {
                        tracing::warn!(company, county = %county, "malformed county entry, skipped");
                        out.skipped += 1;
                    }
                }
            }
        }

        Ok(out)
    }
}
