// End-to-end runs of the sync pipeline against mocked feeds and a
// temporary SQLite database.
// Run with: cargo test -p outage-cli --test run_pipeline

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;

use outage_cli::config::SyncConfig;
use outage_cli::{logging, pipeline};
use outage_io::{Database, Table, TimeSeries};
use outage_recon::{KeyedStore, SENTINEL_OUT};

fn interval_report(areas: serde_json::Value) -> serde_json::Value {
    json!({ "file_data": { "areas": [ { "areas": areas } ] } })
}

fn mock_feeds(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path_includes("report_region.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(interval_report(json!([
                { "area_name": "Henrico", "cust_s": 100000, "cust_a": { "val": 250 } },
                { "area_name": "Chesterfield", "cust_s": 80000, "cust_a": { "val": 10 } }
            ])));
    });
    server.mock(|when, then| {
        when.method(GET).path_includes("report_county.json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(interval_report(json!([
                { "area_name": "Roanoke", "cust_s": 40000, "cust_a": { "val": 12 } },
                { "area_name": "Botetourt", "cust_s": 9000, "cust_a": { "val": 3 } }
            ])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/data.js");
        then.status(200).body(concat!(
            "var data = [{\"name\":\"Mecklenburg Electric\",\"out\":5}];\r\n",
            "var coop_data = {\"1\":{\"company\":\"Mecklenburg Electric\",\"county\":[",
            "{\"name\":\"Mecklenburg\",\"outage\":5},{\"name\":\"Brunswick\"}]}};\r\n",
        ));
    });
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn config(server: &MockServer, dir: &Path) -> SyncConfig {
    let provider_seed = write(
        dir,
        "provider_localities.csv",
        "name,provider\n\
         Henrico,Dominion Virginia Power\n\
         Chesterfield,Dominion Virginia Power\n\
         Hanover,Dominion Virginia Power\n\
         Roanoke,American Electric Power\n\
         Mecklenburg,Mecklenburg Electric\n",
    );
    let locality_seed = write(
        dir,
        "localities.csv",
        "name\nHenrico\nChesterfield\nHanover\nRoanoke\nBotetourt\nMecklenburg\n",
    );
    let region_seed = write(dir, "regions.csv", "name\nCentral\nSouthwest\n");

    let toml = format!(
        r#"
[providers]
dom_base = "{base}/dom"
aep_base = "{base}/aep"
coop_url = "{base}/data.js"

[window]
max_offset = 1

[paths]
database = "{db}"
audit_csv = "{csv}"

[seed]
provider_localities = "{p}"
localities = "{l}"
regions = "{r}"

[regions]
Central = ["Henrico", "Chesterfield", "Hanover"]
Southwest = ["Roanoke", "Botetourt"]
"#,
        base = server.base_url(),
        db = dir.join("state").join("outages.sqlite").display(),
        csv = dir.join("CSV_Output.csv").display(),
        p = provider_seed.display(),
        l = locality_seed.display(),
        r = region_seed.display(),
    );
    SyncConfig::from_toml(&toml).unwrap()
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 14, minute, 5).unwrap()
}

#[test]
fn first_run_populates_every_store() {
    logging::init_test();
    let server = MockServer::start();
    mock_feeds(&server);
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());

    let summary = pipeline::run(&config, at(17)).unwrap();

    assert!(summary.failures.is_empty(), "{:?}", summary.failures);
    assert_eq!(summary.records, 5);
    assert_eq!(summary.feeds.len(), 3);
    assert_eq!(summary.feeds[2].skipped, 1);
    assert!(summary.feeds[0].url.contains("2026_03_02_14_15_00"));
    assert_eq!(summary.audit_rows, Some(5));

    let providers = summary.outcome("provider_localities").unwrap();
    assert_eq!(providers.entities, 5);
    assert_eq!(providers.matched, 4);
    assert_eq!(providers.unmatched_keys, vec!["americanelectricpowerbotetourt"]);
    assert_eq!(providers.reported, 4);

    let localities = summary.outcome("localities").unwrap();
    assert_eq!(localities.matched, 5);
    assert_eq!(localities.unmatched, 0);
    assert_eq!(localities.reported, 5);

    let regions = summary.outcome("regions").unwrap();
    assert_eq!(regions.matched, 2);
    assert_eq!(summary.unassigned_localities, vec!["mecklenburg"]);

    let db = Database::open(&config.paths.database).unwrap();
    let store = db.store(Table::Localities);
    let henrico = store.find_by_key("henrico").unwrap().unwrap();
    assert_eq!(henrico.customers_out, 250);
    assert_eq!(henrico.human_readable, Some(250));
    assert_eq!(henrico.last_report, Some(SENTINEL_OUT));
    assert_eq!(henrico.delta, 250 - SENTINEL_OUT);
    assert_eq!(henrico.last_updated, Some(at(17)));

    let hanover = store.find_by_key("hanover").unwrap().unwrap();
    assert_eq!(hanover.customers_out, SENTINEL_OUT);
    assert_eq!(hanover.human_readable, Some(0));
    assert_eq!(hanover.delta, 0);

    let central = db.store(Table::Regions).find_by_key("central").unwrap().unwrap();
    assert_eq!(central.customers_out, 260);
    let southwest = db.store(Table::Regions).find_by_key("southwest").unwrap().unwrap();
    assert_eq!(southwest.customers_out, 15);

    assert_eq!(db.time_series_len(TimeSeries::WithPoint).unwrap(), 6);
    assert_eq!(db.time_series_len(TimeSeries::Long).unwrap(), 6);

    let audit = std::fs::read_to_string(&config.paths.audit_csv).unwrap();
    let lines: Vec<&str> = audit.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "LOCALITY,PROVIDER,KEY,LOC_CUST_SERVED,LOC_OUT,DATE_PULLED");
    assert!(lines[1].starts_with("Henrico,Dominion Virginia Power,dominionvirginiapowerhenrico,100000,250,2026-03-02 14:17:05"));
    assert!(lines[5].starts_with("Mecklenburg,Mecklenburg Electric,mecklenburgelectricmecklenburg,0,5,"));
}

#[test]
fn second_run_reports_deltas_against_the_first() {
    logging::init_test();
    let server = MockServer::start();
    mock_feeds(&server);
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());

    pipeline::run(&config, at(17)).unwrap();
    let summary = pipeline::run(&config, at(32)).unwrap();
    assert!(summary.failures.is_empty(), "{:?}", summary.failures);

    let db = Database::open(&config.paths.database).unwrap();
    let henrico = db.store(Table::Localities).find_by_key("henrico").unwrap().unwrap();
    assert_eq!(henrico.last_report, Some(250));
    assert_eq!(henrico.delta, 0);
    assert_eq!(henrico.last_updated, Some(at(32)));

    // Reseeding between runs leaves outage state alone.
    assert_eq!(db.store(Table::ProviderLocalities).len().unwrap(), 5);
    assert_eq!(db.time_series_len(TimeSeries::Long).unwrap(), 12);

    // The audit file is rewritten, not appended to.
    let audit = std::fs::read_to_string(&config.paths.audit_csv).unwrap();
    assert_eq!(audit.lines().count(), 6);
}

#[test]
fn unwritable_audit_path_does_not_stop_the_stores() {
    logging::init_test();
    let server = MockServer::start();
    mock_feeds(&server);
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&server, dir.path());
    // A directory cannot be opened as the audit file.
    config.paths.audit_csv = dir.path().to_path_buf();

    let summary = pipeline::run(&config, at(17)).unwrap();

    assert_eq!(summary.audit_rows, None);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].starts_with("audit:"));
    assert_eq!(summary.stores.len(), 3);
}

#[test]
fn missing_seed_file_fails_only_its_table() {
    logging::init_test();
    let server = MockServer::start();
    mock_feeds(&server);
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&server, dir.path());
    config.seed.regions = Some(dir.path().join("no_such_regions.csv"));

    let summary = pipeline::run(&config, at(17)).unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].starts_with("seed regions:"));
    // The regional store simply has no entities to match.
    let regions = summary.outcome("regions").unwrap();
    assert_eq!(regions.entities, 0);
    assert_eq!(regions.unmatched, 2);
    assert_eq!(summary.outcome("localities").unwrap().matched, 5);
}

#[test]
fn unpublished_report_is_fatal_before_any_write() {
    logging::init_test();
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());

    let err = pipeline::run(&config, at(17)).unwrap_err();

    assert!(err.to_string().contains("after 4 candidate URLs"), "{err}");
    assert!(!config.paths.audit_csv.exists());
    assert!(!config.paths.database.exists());
}

#[test]
fn broken_locality_table_leaves_other_stores_reconciled() {
    logging::init_test();
    let server = MockServer::start();
    mock_feeds(&server);
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());

    // A locality table from an older layout, missing the outage columns.
    std::fs::create_dir_all(config.paths.database.parent().unwrap()).unwrap();
    let conn = rusqlite::Connection::open(&config.paths.database).unwrap();
    conn.execute_batch("CREATE TABLE localities (key TEXT PRIMARY KEY, name TEXT NOT NULL);")
        .unwrap();
    drop(conn);

    let summary = pipeline::run(&config, at(17)).unwrap();

    let units: Vec<&str> = summary
        .failures
        .iter()
        .map(|f| f.split(':').next().unwrap())
        .collect();
    assert_eq!(
        units,
        vec![
            "seed localities",
            "localities",
            "locality_time_series",
            "locality_time_series_long",
        ]
    );
    assert!(
        summary.failures[1].starts_with("localities: snapshot_last_report failed: "),
        "{}",
        summary.failures[1]
    );

    assert!(summary.outcome("localities").is_none());
    assert_eq!(summary.outcome("provider_localities").unwrap().matched, 4);
    assert_eq!(summary.outcome("regions").unwrap().matched, 2);
    assert!(summary.time_series.is_empty());

    let db = Database::open(&config.paths.database).unwrap();
    let central = db.store(Table::Regions).find_by_key("central").unwrap().unwrap();
    assert_eq!(central.customers_out, 260);
}
