use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{ReconError, ReconStep, StoreError};
use crate::model::{FreshValue, ReconcileOutcome, SENTINEL_OUT};
use crate::store::KeyedStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Also write the human-readable outage column (locality-level stores).
    pub human_readable: bool,
}

/// Apply one run's fresh values to a store.
///
/// Steps, in order: snapshot current into last report, reset every entity
/// to unknown, write each fresh value onto its matching entity, recompute
/// deltas. Fresh values without a matching entity are counted and dropped.
/// If two fresh values share a key the later one wins.
pub fn reconcile<S: KeyedStore + ?Sized>(
    store: &mut S,
    fresh: &[FreshValue],
    observed_at: DateTime<Utc>,
    opts: ReconcileOptions,
) -> Result<ReconcileOutcome, ReconError> {
    let store_name = store.name().to_string();
    let wrap = |step: ReconStep| {
        let store = store_name.clone();
        move |source: StoreError| ReconError { store, step, source }
    };

    store
        .snapshot_last_report()
        .map_err(wrap(ReconStep::SnapshotLastReport))?;
    store.reset_current().map_err(wrap(ReconStep::ResetCurrent))?;

    let mut matched = 0usize;
    let mut unmatched = 0usize;
    let mut unmatched_keys = BTreeSet::new();

    for value in fresh {
        let found = store
            .find_by_key(&value.key)
            .map_err(wrap(ReconStep::ApplyFresh))?;
        let Some(mut entity) = found else {
            debug!(store = %store_name, key = %value.key, "no entity for key");
            unmatched += 1;
            unmatched_keys.insert(value.key.clone());
            continue;
        };

        entity.customers_out = value.customers_out;
        entity.last_updated = Some(observed_at);
        if opts.human_readable {
            entity.human_readable = Some(if value.customers_out == SENTINEL_OUT {
                0
            } else {
                value.customers_out
            });
        }
        store
            .update_entity(&entity)
            .map_err(wrap(ReconStep::ApplyFresh))?;
        matched += 1;
    }

    store.compute_delta().map_err(wrap(ReconStep::ComputeDelta))?;

    let entities = store.entities().map_err(wrap(ReconStep::ComputeDelta))?;
    let outcome = ReconcileOutcome {
        store: store_name.clone(),
        entities: entities.len(),
        matched,
        unmatched,
        unmatched_keys: unmatched_keys.into_iter().collect(),
        reported: entities.iter().filter(|e| e.is_reported()).count(),
    };

    info!(
        store = %store_name,
        matched = outcome.matched,
        unmatched = outcome.unmatched,
        reported = outcome.reported,
        entities = outcome.entities,
        "store reconciled"
    );
    Ok(outcome)
}
