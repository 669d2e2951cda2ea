//! Keyed record store contract.
//!
//! The reconciliation engine only talks to stores through [`KeyedStore`],
//! so it stays independent of any storage technology. The entity set of a
//! store is fixed by whoever loaded it; the engine never creates rows.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::model::{StoreEntity, SENTINEL_OUT};

pub trait KeyedStore {
    /// Name used in logs and outcomes.
    fn name(&self) -> &str;

    /// Number of entities.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Look up one entity by join key.
    fn find_by_key(&self, key: &str) -> Result<Option<StoreEntity>, StoreError>;

    /// Write back an entity previously returned by `find_by_key`.
    /// Returns `false` when no entity has that key.
    fn update_entity(&mut self, entity: &StoreEntity) -> Result<bool, StoreError>;

    /// Null "last report", then copy "customers out" into it for every entity.
    fn snapshot_last_report(&mut self) -> Result<(), StoreError>;

    /// Mark every entity unknown: customers out to the sentinel, last
    /// updated to null, and the human-readable column (where present) to 0.
    fn reset_current(&mut self) -> Result<(), StoreError>;

    /// Zero every delta, then set `delta = current - last_report` for
    /// every entity whose current value is not the sentinel.
    fn compute_delta(&mut self) -> Result<(), StoreError>;

    /// Every entity, ordered by key.
    fn entities(&self) -> Result<Vec<StoreEntity>, StoreError>;
}

/// Delta for one entity: `current - last_report`, 0 while the current
/// value is unknown. A missing previous report counts as zero.
pub fn delta_for(current: i64, last_report: Option<i64>) -> i64 {
    if current == SENTINEL_OUT {
        return 0;
    }
    current - last_report.unwrap_or(0)
}

/// In-process store backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: String,
    rows: BTreeMap<String, StoreEntity>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Build a store from an authoritative entity list.
    pub fn with_entities(name: impl Into<String>, entities: impl IntoIterator<Item = StoreEntity>) -> Self {
        let mut store = Self::new(name);
        for entity in entities {
            store.rows.insert(entity.key.clone(), entity);
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<&StoreEntity> {
        self.rows.get(key)
    }
}

impl KeyedStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.rows.len())
    }

    fn find_by_key(&self, key: &str) -> Result<Option<StoreEntity>, StoreError> {
        Ok(self.rows.get(key).cloned())
    }

    fn update_entity(&mut self, entity: &StoreEntity) -> Result<bool, StoreError> {
        match self.rows.get_mut(&entity.key) {
            Some(row) => {
                *row = entity.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn snapshot_last_report(&mut self) -> Result<(), StoreError> {
        for row in self.rows.values_mut() {
            row.last_report = Some(row.customers_out);
        }
        Ok(())
    }

    fn reset_current(&mut self) -> Result<(), StoreError> {
        for row in self.rows.values_mut() {
            row.customers_out = SENTINEL_OUT;
            row.last_updated = None;
            if row.human_readable.is_some() {
                row.human_readable = Some(0);
            }
        }
        Ok(())
    }

    fn compute_delta(&mut self) -> Result<(), StoreError> {
        for row in self.rows.values_mut() {
            row.delta = delta_for(row.customers_out, row.last_report);
        }
        Ok(())
    }

    fn entities(&self) -> Result<Vec<StoreEntity>, StoreError> {
        Ok(self.rows.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_rules() {
        assert_eq!(delta_for(250, Some(200)), 50);
        assert_eq!(delta_for(100, Some(250)), -150);
        assert_eq!(delta_for(SENTINEL_OUT, Some(250)), 0);
        // Unknown last run: the sentinel is subtracted as stored.
        assert_eq!(delta_for(40, Some(SENTINEL_OUT)), 40 - SENTINEL_OUT);
        assert_eq!(delta_for(40, None), 40);
    }

    #[test]
    fn update_unknown_key_is_rejected() {
        let mut store = MemoryStore::with_entities("t", [StoreEntity::new("henrico", "Henrico")]);
        let stray = StoreEntity::new("atlantis", "Atlantis");
        assert!(!store.update_entity(&stray).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn reset_leaves_human_readable_absent_where_not_carried() {
        let mut store = MemoryStore::with_entities(
            "t",
            [
                StoreEntity::new("a", "A"),
                StoreEntity::new("b", "B").with_human_readable(),
            ],
        );
        store.reset_current().unwrap();
        assert_eq!(store.get("a").unwrap().human_readable, None);
        assert_eq!(store.get("b").unwrap().human_readable, Some(0));
    }
}
