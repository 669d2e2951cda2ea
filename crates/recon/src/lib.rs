//! `outage-recon`: outage normalization and reconciliation engine.
//!
//! Pure engine crate: receives scraped records, dissolves them into
//! locality and region totals, and applies them to keyed stores.
//! No network or file IO.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod store;

pub use aggregate::{dissolve, dissolve_regions, RegionMap};
pub use engine::{reconcile, ReconcileOptions};
pub use error::{ReconError, ReconStep, StoreError};
pub use key::{build_key, dissolve_key};
pub use model::{
    FreshValue, LocalityAggregate, OutageRecord, ReconcileOutcome, RegionAggregate, StoreEntity,
    SENTINEL_OUT,
};
pub use store::{KeyedStore, MemoryStore};
