//! SQLite-backed keyed stores.
//!
//! One database file holds the three entity tables (provider-locality,
//! locality, regional) plus the two append-only locality time series.
//! Timestamps are stored as RFC 3339 text.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use outage_recon::{KeyedStore, StoreEntity, StoreError, SENTINEL_OUT};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS provider_localities (
    key            TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    cust_out       INTEGER NOT NULL DEFAULT -9999,
    last_updated   TEXT,
    last_report    INTEGER,
    delta          INTEGER NOT NULL DEFAULT 0,
    human_readable INTEGER
);

CREATE TABLE IF NOT EXISTS localities (
    key            TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    cust_out       INTEGER NOT NULL DEFAULT -9999,
    last_updated   TEXT,
    last_report    INTEGER,
    delta          INTEGER NOT NULL DEFAULT 0,
    human_readable INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS regions (
    key            TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    cust_out       INTEGER NOT NULL DEFAULT -9999,
    last_updated   TEXT,
    last_report    INTEGER,
    delta          INTEGER NOT NULL DEFAULT 0,
    human_readable INTEGER
);

CREATE TABLE IF NOT EXISTS locality_time_series (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    captured_at  TEXT NOT NULL,
    point_x      REAL NOT NULL,   -- placeholder geometry
    point_y      REAL NOT NULL,
    key          TEXT NOT NULL,
    name         TEXT NOT NULL,
    cust_out     INTEGER NOT NULL,
    last_updated TEXT,
    last_report  INTEGER,
    delta        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS locality_time_series_long (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    captured_at  TEXT NOT NULL,
    key          TEXT NOT NULL,
    name         TEXT NOT NULL,
    cust_out     INTEGER NOT NULL,
    last_updated TEXT,
    last_report  INTEGER,
    delta        INTEGER NOT NULL
);
"#;

/// The three entity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    ProviderLocalities,
    Localities,
    Regions,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::ProviderLocalities, Table::Localities, Table::Regions];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProviderLocalities => "provider_localities",
            Self::Localities => "localities",
            Self::Regions => "regions",
        }
    }

    /// Only the locality table carries the human-readable column.
    pub fn has_human_readable(&self) -> bool {
        matches!(self, Self::Localities)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Time-series variants copied from the locality table each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeries {
    /// Copies carry a `(0.0, 0.0)` point placeholder.
    WithPoint,
    Long,
}

impl TimeSeries {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WithPoint => "locality_time_series",
            Self::Long => "locality_time_series_long",
        }
    }
}

/// An open outage database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable {
            store: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::init(conn, &path.display().to_string())
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Unavailable {
            store: ":memory:".into(),
            message: e.to_string(),
        })?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(|e| StoreError::Unavailable {
            store: label.to_string(),
            message: format!("schema: {e}"),
        })?;
        Ok(Self { conn })
    }

    /// Keyed-store view over one entity table.
    pub fn store(&self, table: Table) -> SqliteStore<'_> {
        SqliteStore { conn: &self.conn, table }
    }

    /// Insert or rename entities. Existing outage state is left alone, so
    /// reseeding the authoritative dataset is safe between runs.
    pub fn seed(&self, table: Table, entities: &[(String, String)]) -> Result<usize, StoreError> {
        let err = query_err(table);
        let tx = self.conn.unchecked_transaction().map_err(&err)?;
        let sql = format!(
            "INSERT INTO {t} (key, name, human_readable) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET name = excluded.name",
            t = table.name()
        );
        let human_readable: Option<i64> = table.has_human_readable().then_some(0);
        {
            let mut stmt = tx.prepare(&sql).map_err(&err)?;
            for (key, name) in entities {
                stmt.execute(params![key, name, human_readable]).map_err(&err)?;
            }
        }
        tx.commit().map_err(&err)?;
        Ok(entities.len())
    }

    /// Copy every locality row into a time-series table. Returns rows added.
    pub fn append_time_series(
        &self,
        series: TimeSeries,
        captured_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let sql = match series {
            TimeSeries::WithPoint => format!(
                "INSERT INTO {ts} (captured_at, point_x, point_y, key, name, cust_out, last_updated, last_report, delta)
                 SELECT ?1, 0.0, 0.0, key, name, cust_out, last_updated, last_report, delta FROM {t}",
                ts = series.name(),
                t = Table::Localities.name(),
            ),
            TimeSeries::Long => format!(
                "INSERT INTO {ts} (captured_at, key, name, cust_out, last_updated, last_report, delta)
                 SELECT ?1, key, name, cust_out, last_updated, last_report, delta FROM {t}",
                ts = series.name(),
                t = Table::Localities.name(),
            ),
        };
        self.conn
            .execute(&sql, params![captured_at.to_rfc3339()])
            .map_err(|e| StoreError::Query {
                store: series.name().to_string(),
                message: e.to_string(),
            })
    }

    /// Rows in a time-series table.
    pub fn time_series_len(&self, series: TimeSeries) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", series.name());
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| StoreError::Query {
                store: series.name().to_string(),
                message: e.to_string(),
            })
    }
}

fn query_err(table: Table) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| StoreError::Query {
        store: table.name().to_string(),
        message: e.to_string(),
    }
}

/// [`KeyedStore`] over one table of a [`Database`].
pub struct SqliteStore<'a> {
    conn: &'a Connection,
    table: Table,
}

impl SqliteStore<'_> {
    fn exec(&self, sql: &str) -> Result<usize, StoreError> {
        let sql = sql.replace("{t}", self.table.name());
        self.conn.execute(&sql, []).map_err(query_err(self.table))
    }

    fn entity_from_row(&self, row: &Row<'_>) -> rusqlite::Result<(StoreEntity, Option<String>)> {
        let entity = StoreEntity {
            key: row.get(0)?,
            name: row.get(1)?,
            customers_out: row.get(2)?,
            last_updated: None,
            last_report: row.get(4)?,
            delta: row.get(5)?,
            human_readable: row.get(6)?,
        };
        Ok((entity, row.get(3)?))
    }

    fn decode(&self, (mut entity, stamp): (StoreEntity, Option<String>)) -> Result<StoreEntity, StoreError> {
        if let Some(stamp) = stamp {
            let parsed = DateTime::parse_from_rfc3339(&stamp).map_err(|e| StoreError::Corrupt {
                store: self.table.name().to_string(),
                key: entity.key.clone(),
                message: format!("last_updated '{stamp}': {e}"),
            })?;
            entity.last_updated = Some(parsed.with_timezone(&Utc));
        }
        Ok(entity)
    }
}

const SELECT_COLUMNS: &str =
    "key, name, cust_out, last_updated, last_report, delta, human_readable";

impl KeyedStore for SqliteStore<'_> {
    fn name(&self) -> &str {
        self.table.name()
    }

    fn len(&self) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table.name());
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(query_err(self.table))
    }

    fn find_by_key(&self, key: &str) -> Result<Option<StoreEntity>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM {} WHERE key = ?1",
            self.table.name()
        );
        let raw = self
            .conn
            .query_row(&sql, params![key], |row| self.entity_from_row(row))
            .optional()
            .map_err(query_err(self.table))?;
        raw.map(|r| self.decode(r)).transpose()
    }

    fn update_entity(&mut self, entity: &StoreEntity) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE {} SET cust_out = ?2, last_updated = ?3, last_report = ?4, delta = ?5, human_readable = ?6
             WHERE key = ?1",
            self.table.name()
        );
        let changed = self
            .conn
            .execute(
                &sql,
                params![
                    entity.key,
                    entity.customers_out,
                    entity.last_updated.map(|t| t.to_rfc3339()),
                    entity.last_report,
                    entity.delta,
                    entity.human_readable,
                ],
            )
            .map_err(query_err(self.table))?;
        Ok(changed > 0)
    }

    fn snapshot_last_report(&mut self) -> Result<(), StoreError> {
        self.exec("UPDATE {t} SET last_report = NULL")?;
        let n = self.exec("UPDATE {t} SET last_report = cust_out")?;
        debug!(store = %self.table, rows = n, "last report snapshot");
        Ok(())
    }

    fn reset_current(&mut self) -> Result<(), StoreError> {
        self.exec(&format!(
            "UPDATE {{t}} SET cust_out = {SENTINEL_OUT}, last_updated = NULL,
             human_readable = CASE WHEN human_readable IS NULL THEN NULL ELSE 0 END"
        ))?;
        Ok(())
    }

    fn compute_delta(&mut self) -> Result<(), StoreError> {
        self.exec("UPDATE {t} SET delta = 0")?;
        self.exec(&format!(
            "UPDATE {{t}} SET delta = cust_out - COALESCE(last_report, 0)
             WHERE cust_out <> {SENTINEL_OUT}"
        ))?;
        Ok(())
    }

    fn entities(&self) -> Result<Vec<StoreEntity>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM {} ORDER BY key",
            self.table.name()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(query_err(self.table))?;
        let raw = stmt
            .query_map([], |row| self.entity_from_row(row))
            .map_err(query_err(self.table))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err(self.table))?;
        raw.into_iter().map(|r| self.decode(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use outage_recon::{reconcile, FreshValue, ReconcileOptions};

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 9, min, 0).unwrap()
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            Table::Localities,
            &[
                ("henrico".into(), "Henrico".into()),
                ("surry".into(), "Surry".into()),
            ],
        )
        .unwrap();
        db
    }

    #[test]
    fn seed_starts_unknown() {
        let db = seeded();
        let store = db.store(Table::Localities);
        assert_eq!(store.len().unwrap(), 2);
        let henrico = store.find_by_key("henrico").unwrap().unwrap();
        assert_eq!(henrico.customers_out, SENTINEL_OUT);
        assert_eq!(henrico.last_updated, None);
        assert_eq!(henrico.human_readable, Some(0));
        assert!(store.find_by_key("atlantis").unwrap().is_none());
    }

    #[test]
    fn reseed_keeps_state() {
        let db = seeded();
        let mut store = db.store(Table::Localities);
        reconcile(
            &mut store,
            &[FreshValue { key: "henrico".into(), customers_out: 12 }],
            at(2),
            ReconcileOptions { human_readable: true },
        )
        .unwrap();
        db.seed(Table::Localities, &[("henrico".into(), "Henrico County".into())]).unwrap();

        let henrico = db.store(Table::Localities).find_by_key("henrico").unwrap().unwrap();
        assert_eq!(henrico.name, "Henrico County");
        assert_eq!(henrico.customers_out, 12);
    }

    #[test]
    fn reconcile_round_trips_through_sql() {
        let db = seeded();
        let opts = ReconcileOptions { human_readable: true };
        let fresh = [FreshValue { key: "henrico".into(), customers_out: 250 }];

        let mut store = db.store(Table::Localities);
        reconcile(&mut store, &fresh, at(2), opts).unwrap();
        let fresh = [FreshValue { key: "henrico".into(), customers_out: 100 }];
        let outcome = reconcile(&mut store, &fresh, at(17), opts).unwrap();
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.reported, 1);

        let henrico = store.find_by_key("henrico").unwrap().unwrap();
        assert_eq!(henrico.customers_out, 100);
        assert_eq!(henrico.last_report, Some(250));
        assert_eq!(henrico.delta, -150);
        assert_eq!(henrico.last_updated, Some(at(17)));
        assert_eq!(henrico.human_readable, Some(100));

        let surry = store.find_by_key("surry").unwrap().unwrap();
        assert_eq!(surry.customers_out, SENTINEL_OUT);
        assert_eq!(surry.delta, 0);
        assert_eq!(surry.human_readable, Some(0));
    }

    #[test]
    fn delta_after_unknown_run_matches_memory_store() {
        let db = seeded();
        let opts = ReconcileOptions { human_readable: true };
        let fresh = [FreshValue { key: "henrico".into(), customers_out: 250 }];
        let mut store = db.store(Table::Localities);
        reconcile(&mut store, &fresh, at(2), opts).unwrap();

        let henrico = store.find_by_key("henrico").unwrap().unwrap();
        assert_eq!(henrico.last_report, Some(SENTINEL_OUT));
        assert_eq!(henrico.delta, outage_recon::store::delta_for(250, Some(SENTINEL_OUT)));
        assert_eq!(henrico.delta, 250 - SENTINEL_OUT);
    }

    #[test]
    fn non_locality_tables_have_no_human_readable() {
        let db = Database::open_in_memory().unwrap();
        db.seed(Table::Regions, &[("central".into(), "Central".into())]).unwrap();
        let mut store = db.store(Table::Regions);
        store.reset_current().unwrap();
        let central = store.find_by_key("central").unwrap().unwrap();
        assert_eq!(central.human_readable, None);
    }

    #[test]
    fn time_series_is_append_only() {
        let db = seeded();
        assert_eq!(db.append_time_series(TimeSeries::WithPoint, at(2)).unwrap(), 2);
        assert_eq!(db.append_time_series(TimeSeries::WithPoint, at(17)).unwrap(), 2);
        assert_eq!(db.append_time_series(TimeSeries::Long, at(17)).unwrap(), 2);
        assert_eq!(db.time_series_len(TimeSeries::WithPoint).unwrap(), 4);
        assert_eq!(db.time_series_len(TimeSeries::Long).unwrap(), 2);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outages.sqlite");
        {
            let db = Database::open(&path).unwrap();
            db.seed(Table::ProviderLocalities, &[("aepbland".into(), "Bland".into())]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.store(Table::ProviderLocalities).len().unwrap(), 1);
    }
}
