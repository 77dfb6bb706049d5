//! Process-local entity collections used when no backend is reachable.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::models::Entity;

/// Thread-safe in-memory collection of one entity type.
///
/// Cloned handles share the same records. Contents reset to the seed on
/// process restart.
pub struct EntityStore<T: Entity> {
    inner: Arc<RwLock<Inner<T>>>,
}

struct Inner<T> {
    records: Vec<T>,
    last_stamp: i64,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Entity> EntityStore<T> {
    /// Build a store seeded with `records`.
    pub fn new(records: Vec<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                records,
                last_stamp: 0,
            })),
        }
    }

    /// Snapshot of every record, in insertion order.
    pub fn all(&self) -> Vec<T> {
        self.inner.read().records.clone()
    }

    /// Record with the given id, if present.
    pub fn get(&self, id: &str) -> Option<T> {
        self.inner
            .read()
            .records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// True when the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a record built from `draft` under a fresh id and return it.
    pub fn insert(&self, draft: T::Draft) -> T {
        let mut inner = self.inner.write();
        let id = inner.next_id(T::ID_PREFIX);
        let record = T::from_draft(id, draft);
        inner.records.push(record.clone());
        record
    }

    /// Merge `patch` over the record with `id`; `None` when absent.
    pub fn update(&self, id: &str, patch: T::Patch) -> Option<T> {
        let mut inner = self.inner.write();
        let record = inner.records.iter_mut().find(|record| record.id() == id)?;
        record.apply(patch);
        Some(record.clone())
    }

    /// Remove the record with `id`; `false` when nothing was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        let before = inner.records.len();
        inner.records.retain(|record| record.id() != id);
        inner.records.len() != before
    }
}

impl<T> Inner<T> {
    /// Millisecond timestamp, bumped when two inserts land in the same millisecond.
    fn next_id(&mut self, prefix: &str) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_stamp = now.max(self.last_stamp + 1);
        format!("{prefix}{}", self.last_stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::{Bus, BusPatch, BusStatus, NewBus};

    fn new_bus(plate: &str) -> NewBus {
        NewBus {
            plate: plate.to_string(),
            model: "Irizar i8".to_string(),
            capacity: 48,
            year: 2024,
            status: BusStatus::Active,
        }
    }

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let store: EntityStore<Bus> = EntityStore::default();
        let first = store.insert(new_bus("AAA-111"));
        let second = store.insert(new_bus("AAA-112"));
        assert!(first.id.starts_with('b'));
        assert_ne!(first.id, second.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clones_share_records() {
        let store = EntityStore::new(fixtures::buses());
        let handle = store.clone();
        assert!(handle.remove("b3"));
        assert!(store.get("b3").is_none());
        assert!(!store.remove("b3"));
    }

    #[test]
    fn update_of_missing_record_is_none() {
        let store = EntityStore::new(fixtures::buses());
        let patch = BusPatch {
            capacity: Some(10),
            ..BusPatch::default()
        };
        assert!(store.update("missing", patch).is_none());
    }
}
