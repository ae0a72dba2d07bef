//! Versioned in-memory entity store with optimistic concurrency.
//!
//! Each row carries a monotonically increasing version. Readers get a
//! cloned snapshot plus the version it was taken at; writers commit with
//! compare-and-swap against that version. A stale write fails with
//! `Conflict` and is never merged, so two callers racing from the same
//! snapshot cannot both win. The backing map is the persistence seam:
//! the orchestration semantics only assume snapshot reads and per-entity
//! CAS, which any transactional backend can provide.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::RwLock;

use crate::error::{OrchestratorError, Result};

/// A snapshot of one entity together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

#[derive(Debug)]
pub struct EntityStore<K, T> {
    entity: &'static str,
    rows: RwLock<HashMap<K, Versioned<T>>>,
}

impl<K, T> EntityStore<K, T>
where
    K: Eq + Hash + Copy + Display,
    T: Clone,
{
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new row at version 1. Panics are avoided: re-inserting an
    /// existing id is a caller bug surfaced as a conflict.
    pub fn insert(&self, id: K, record: T) -> Result<u64> {
        let mut rows = self.rows.write().expect("store lock poisoned");
        if rows.contains_key(&id) {
            return Err(OrchestratorError::Conflict {
                entity: self.entity,
                id: id.to_string(),
                expected: 0,
                found: rows[&id].version,
            });
        }
        rows.insert(id, Versioned { record, version: 1 });
        Ok(1)
    }

    pub fn get(&self, id: K) -> Result<Versioned<T>> {
        let rows = self.rows.read().expect("store lock poisoned");
        rows.get(&id)
            .cloned()
            .ok_or_else(|| OrchestratorError::not_found(self.entity, id))
    }

    /// Commit `record` only if the row is still at `expected`. Returns the
    /// new version on success.
    pub fn compare_and_swap(&self, id: K, expected: u64, record: T) -> Result<u64> {
        let mut rows = self.rows.write().expect("store lock poisoned");
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found(self.entity, id))?;
        if row.version != expected {
            return Err(OrchestratorError::Conflict {
                entity: self.entity,
                id: id.to_string(),
                expected,
                found: row.version,
            });
        }
        row.record = record;
        row.version += 1;
        Ok(row.version)
    }

    /// Snapshot every row matching the predicate. Used for per-book
    /// chapter scans and the pricing sweep.
    pub fn filter(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<Versioned<T>> {
        let rows = self.rows.read().expect("store lock poisoned");
        rows.values()
            .filter(|row| predicate(&row.record))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
