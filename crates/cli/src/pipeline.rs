//! One scrape-and-reconcile run.
//!
//! Phases, in order:
//!
//! 1. resolve the DOM and AEP report URLs for the current time window
//! 2. fetch and parse DOM, AEP and co-op payloads
//! 3. rewrite the audit CSV
//! 4. open the database and apply the seed files
//! 5. reconcile provider-locality, locality, time series and regional units
//!
//! Phases 1 and 2 are fatal: nothing is written unless every feed parsed.
//! From phase 3 on, each unit fails on its own; the failure is logged and
//! recorded in the summary and the next unit still runs.

use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use outage_io::{load_seed_csv, AuditSink, Database, Table, TimeSeries};
use outage_recon::{
    dissolve, dissolve_regions, reconcile, FreshValue, KeyedStore, OutageRecord, ReconcileOptions,
    ReconcileOutcome,
};

use crate::config::SyncConfig;
use crate::fetch::{
    interval_url, resolve, CoopFeed, FetchClient, FetchError, IntervalFeed, IntervalSchema,
    ProviderFeed,
};
use crate::window::TimeWindow;

#[derive(Debug, Serialize)]
pub struct FeedSummary {
    pub provider: String,
    pub url: String,
    pub records: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct SeriesSummary {
    pub table: &'static str,
    pub rows_added: usize,
}

/// What a run did, logged as JSON at the end.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub observed_at: DateTime<Utc>,
    pub feeds: Vec<FeedSummary>,
    pub records: usize,
    pub audit_rows: Option<usize>,
    pub stores: Vec<ReconcileOutcome>,
    pub time_series: Vec<SeriesSummary>,
    /// Locality keys that belong to no configured region.
    pub unassigned_localities: Vec<String>,
    /// `unit: error` for every recovered failure.
    pub failures: Vec<String>,
}

impl RunSummary {
    fn new(observed_at: DateTime<Utc>) -> Self {
        Self {
            observed_at,
            feeds: Vec::new(),
            records: 0,
            audit_rows: None,
            stores: Vec::new(),
            time_series: Vec::new(),
            unassigned_localities: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Log and record a unit failure, passing a success through.
    fn unit<T, E: Display>(&mut self, unit: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!(unit, error = %e, "unit failed, continuing");
                self.failures.push(format!("{unit}: {e}"));
                None
            }
        }
    }

    pub fn outcome(&self, store: &str) -> Option<&ReconcileOutcome> {
        self.stores.iter().find(|o| o.store == store)
    }
}

/// Run every phase against `config`, stamping all output with `observed_at`.
pub fn run(config: &SyncConfig, observed_at: DateTime<Utc>) -> Result<RunSummary, FetchError> {
    let client = FetchClient::new(&config.http)?;
    let mut summary = RunSummary::new(observed_at);

    let records = scrape(config, &client, observed_at, &mut summary)?;
    summary.records = records.len();

    write_audit(&config.paths.audit_csv, &records, &mut summary);

    match open_database(&config.paths.database) {
        Ok(db) => {
            seed(&db, config, &mut summary);
            persist(&db, config, &records, observed_at, &mut summary);
        }
        Err(e) => {
            summary.unit::<(), _>("database", Err(e));
        }
    }

    info!(
        records = summary.records,
        stores = summary.stores.len(),
        failures = summary.failures.len(),
        "run complete"
    );
    Ok(summary)
}

fn scrape(
    config: &SyncConfig,
    client: &FetchClient,
    observed_at: DateTime<Utc>,
    summary: &mut RunSummary,
) -> Result<Vec<OutageRecord>, FetchError> {
    let interval = [
        (IntervalSchema::DOM, config.providers.dom_base.as_str()),
        (IntervalSchema::AEP, config.providers.aep_base.as_str()),
    ];

    let mut targets: Vec<(Box<dyn ProviderFeed>, String)> = Vec::new();
    for (schema, base) in interval {
        let candidates = TimeWindow::new(observed_at, config.window.max_offset)
            .map(|bucket| interval_url(base, &bucket, schema.report));
        let url = resolve(client, schema.provider, candidates)?;
        targets.push((Box::new(IntervalFeed::new(schema)), url));
    }
    targets.push((Box::new(CoopFeed::new()), config.providers.coop_url.clone()));

    let mut records = Vec::new();
    for (feed, url) in targets {
        let parsed = feed.fetch(client, &url, observed_at)?;
        if parsed.skipped > 0 {
            warn!(provider = feed.provider(), skipped = parsed.skipped, "entries skipped");
        }
        summary.feeds.push(FeedSummary {
            provider: feed.provider().to_string(),
            url,
            records: parsed.records.len(),
            skipped: parsed.skipped,
        });
        records.extend(parsed.records);
    }
    Ok(records)
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn write_audit(path: &Path, records: &[OutageRecord], summary: &mut RunSummary) {
    let result = ensure_parent(path)
        .map_err(|e| e.to_string())
        .and_then(|()| AuditSink::create(path).map_err(|e| e.to_string()))
        .and_then(|sink| sink.append(records).map_err(|e| e.to_string()));

    if let Some(rows) = summary.unit("audit", result) {
        info!(rows, path = %path.display(), "audit CSV written");
        summary.audit_rows = Some(rows);
    }
}

fn open_database(path: &Path) -> Result<Database, String> {
    ensure_parent(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Database::open(path).map_err(|e| e.to_string())
}

fn seed(db: &Database, config: &SyncConfig, summary: &mut RunSummary) {
    let files = [
        (Table::ProviderLocalities, &config.seed.provider_localities),
        (Table::Localities, &config.seed.localities),
        (Table::Regions, &config.seed.regions),
    ];
    for (table, path) in files {
        let Some(path) = path else { continue };
        let result = load_seed_csv(path, table).and_then(|rows| db.seed(table, &rows));
        if let Some(n) = summary.unit(&format!("seed {table}"), result) {
            info!(table = %table, entities = n, "seeded");
        }
    }
}

fn reconcile_unit(
    summary: &mut RunSummary,
    store: &mut dyn KeyedStore,
    fresh: &[FreshValue],
    observed_at: DateTime<Utc>,
    opts: ReconcileOptions,
) {
    let unit = store.name().to_string();
    if let Some(outcome) = summary.unit(&unit, reconcile(store, fresh, observed_at, opts)) {
        summary.stores.push(outcome);
    }
}

fn persist(
    db: &Database,
    config: &SyncConfig,
    records: &[OutageRecord],
    observed_at: DateTime<Utc>,
    summary: &mut RunSummary,
) {
    let fresh: Vec<FreshValue> = records.iter().map(FreshValue::from).collect();
    reconcile_unit(
        summary,
        &mut db.store(Table::ProviderLocalities),
        &fresh,
        observed_at,
        ReconcileOptions::default(),
    );

    let localities = dissolve(records);
    let fresh: Vec<FreshValue> = localities.iter().map(FreshValue::from).collect();
    reconcile_unit(
        summary,
        &mut db.store(Table::Localities),
        &fresh,
        observed_at,
        ReconcileOptions { human_readable: true },
    );

    for series in [TimeSeries::WithPoint, TimeSeries::Long] {
        let result = db.append_time_series(series, observed_at);
        if let Some(rows_added) = summary.unit(series.name(), result) {
            summary.time_series.push(SeriesSummary {
                table: series.name(),
                rows_added,
            });
        }
    }

    let (regions, unassigned) = dissolve_regions(&localities, &config.regions);
    if !config.regions.is_empty() && !unassigned.is_empty() {
        warn!(count = unassigned.len(), "localities outside every configured region");
    }
    summary.unassigned_localities = unassigned;
    let fresh: Vec<FreshValue> = regions.iter().map(FreshValue::from).collect();
    reconcile_unit(
        summary,
        &mut db.store(Table::Regions),
        &fresh,
        observed_at,
        ReconcileOptions::default(),
    );
}
