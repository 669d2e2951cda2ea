//! `outage-io`: persistence for outage-sync: SQLite keyed stores,
//! locality time series, entity seeding, and the CSV audit file.

pub mod audit;
pub mod seed;
pub mod sqlite;

pub use audit::{AuditError, AuditSink};
pub use seed::load_seed_csv;
pub use sqlite::{Database, SqliteStore, Table, TimeSeries};
