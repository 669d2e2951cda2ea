use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stored in the current-outage column when no fresh record matched an
/// entity during the latest run.
pub const SENTINEL_OUT: i64 = -9999;

// ---------------------------------------------------------------------------
// Scraped input
// ---------------------------------------------------------------------------

/// One provider/locality observation, normalized from any feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutageRecord {
    /// Locality exactly as the provider spells it.
    pub locality: String,
    /// Provider display name.
    pub provider: String,
    /// `build_key(provider, locality)`.
    pub join_key: String,
    /// Customers served. Co-ops do not report it and leave it at 0.
    pub customers_served: u64,
    pub customers_out: u64,
    /// Capture time shared by every record of one run.
    pub observed_at: DateTime<Utc>,
}

impl OutageRecord {
    pub fn new(
        provider: &str,
        locality: &str,
        customers_served: u64,
        customers_out: u64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            locality: locality.to_string(),
            provider: provider.to_string(),
            join_key: crate::key::build_key(provider, locality),
            customers_served,
            customers_out,
            observed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Dissolved totals
// ---------------------------------------------------------------------------

/// Outage total for one locality, summed across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalityAggregate {
    pub key: String,
    pub total_customers_out: i64,
}

/// Outage total for one configured region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionAggregate {
    pub key: String,
    pub name: String,
    pub total_customers_out: i64,
    /// Locality keys that contributed to the total.
    pub localities: Vec<String>,
}

/// A keyed value ready to be applied to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshValue {
    pub key: String,
    pub customers_out: i64,
}

impl From<&OutageRecord> for FreshValue {
    fn from(r: &OutageRecord) -> Self {
        Self {
            key: r.join_key.clone(),
            customers_out: r.customers_out as i64,
        }
    }
}

impl From<&LocalityAggregate> for FreshValue {
    fn from(a: &LocalityAggregate) -> Self {
        Self {
            key: a.key.clone(),
            customers_out: a.total_customers_out,
        }
    }
}

impl From<&RegionAggregate> for FreshValue {
    fn from(a: &RegionAggregate) -> Self {
        Self {
            key: a.key.clone(),
            customers_out: a.total_customers_out,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted entities
// ---------------------------------------------------------------------------

/// One row of a keyed store (provider-locality, locality or regional).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreEntity {
    pub key: String,
    pub name: String,
    /// Current outage count, `SENTINEL_OUT` when unknown.
    pub customers_out: i64,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_report: Option<i64>,
    pub delta: i64,
    /// Display copy of `customers_out` with 0 in place of the sentinel.
    /// `None` on stores that do not carry the column.
    pub human_readable: Option<i64>,
}

impl StoreEntity {
    /// A fresh entity in the "unknown" state.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            customers_out: SENTINEL_OUT,
            last_updated: None,
            last_report: None,
            delta: 0,
            human_readable: None,
        }
    }

    pub fn with_human_readable(mut self) -> Self {
        self.human_readable = Some(0);
        self
    }

    pub fn is_reported(&self) -> bool {
        self.customers_out != SENTINEL_OUT
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What one reconciliation pass did to one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub store: String,
    /// Number of entities in the store.
    pub entities: usize,
    /// Fresh values that found an entity.
    pub matched: usize,
    /// Fresh values whose key has no entity.
    pub unmatched: usize,
    /// Distinct unmatched keys, sorted.
    pub unmatched_keys: Vec<String>,
    /// Entities holding a non-sentinel value after the pass.
    pub reported: usize,
}
