//! DOM and AEP "interval generation" reports.
//!
//! Both providers publish the same JSON layout: a top-level
//! `file_data.areas` list whose first element holds the per-locality
//! `areas`. Only the display name and report file differ.

use chrono::{DateTime, Utc};
use serde_json::Value;

use outage_recon::OutageRecord;

use super::{FeedParse, FetchError, ProviderFeed};

/// Where the interesting fields live in one provider's report.
#[derive(Debug, Clone, Copy)]
pub struct IntervalSchema {
    pub provider: &'static str,
    /// File name under each time bucket directory.
    pub report: &'static str,
    /// JSON pointer to the list of locality entries.
    pub areas: &'static str,
    pub name: &'static str,
    pub served: &'static str,
    pub out: &'static str,
}

impl IntervalSchema {
    pub const DOM: Self = Self {
        provider: "Dominion Virginia Power",
        report: "report_region.json",
        areas: "/file_data/areas/0/areas",
        name: "/area_name",
        served: "/cust_s",
        out: "/cust_a/val",
    };

    pub const AEP: Self = Self {
        provider: "American Electric Power",
        report: "report_county.json",
        areas: "/file_data/areas/0/areas",
        name: "/area_name",
        served: "/cust_s",
        out: "/cust_a/val",
    };
}

#[derive(Debug, Clone, Copy)]
pub struct IntervalFeed {
    schema: IntervalSchema,
}

impl IntervalFeed {
    pub fn new(schema: IntervalSchema) -> Self {
        Self { schema }
    }

    fn field<'a>(&self, area: &'a Value, pointer: &str, index: usize) -> Result<&'a Value, FetchError> {
        area.pointer(pointer).ok_or_else(|| {
            FetchError::parse(
                self.schema.provider,
                format!("area {index} has no '{pointer}'"),
            )
        })
    }

    fn count(&self, area: &Value, pointer: &str, index: usize) -> Result<u64, FetchError> {
        self.field(area, pointer, index)?.as_u64().ok_or_else(|| {
            FetchError::parse(
                self.schema.provider,
                format!("area {index}: '{pointer}' is not a non-negative integer"),
            )
        })
    }
}

impl ProviderFeed for IntervalFeed {
    fn provider(&self) -> &str {
        self.schema.provider
    }

    fn parse(&self, body: &str, observed_at: DateTime<Utc>) -> Result<FeedParse, FetchError> {
        let provider = self.schema.provider;
        let doc: Value =
            serde_json::from_str(body).map_err(|e| FetchError::parse(provider, e.to_string()))?;

        let areas = doc
            .pointer(self.schema.areas)
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::parse(provider, format!("missing list at '{}'", self.schema.areas)))?;

        let mut records = Vec::with_capacity(areas.len());
        for (index, area) in areas.iter().enumerate() {
            let name = self.field(area, self.schema.name, index)?.as_str().ok_or_else(|| {
                FetchError::parse(provider, format!("area {index}: name is not a string"))
            })?;
            let served = self.count(area, self.schema.served, index)?;
            let out = self.count(area, self.schema.out, index)?;
            records.push(OutageRecord::new(provider, name, served, out, observed_at));
        }

        Ok(FeedParse { records, skipped: 0 })
    }
}
