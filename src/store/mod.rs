//! ResourceCollectionStore - the locally materialized, ordered collection.
//!
//! Holds the records the controller currently knows about, unique by id, in
//! display order absent a sort. Whole-collection replacement comes from
//! fetches and searches; single-record edits come from optimistic removal,
//! undo and editor round-trips.

use std::collections::HashSet;

use crate::Record;

/// Where `insert` places a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Head,
    Tail,
    /// Clamped to the current length.
    Index(usize),
}

/// A record taken out of the store, with the index it occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<R> {
    pub index: usize,
    pub record: R,
}

/// Ordered, id-unique collection of records.
#[derive(Debug, Clone)]
pub struct ResourceCollectionStore<R: Record> {
    records: Vec<R>,
}

impl<R: Record> Default for ResourceCollectionStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ResourceCollectionStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Set the collection to exactly `records`, in the given order.
    ///
    /// A snapshot carrying the same id twice keeps the first occurrence.
    pub fn replace_all(&mut self, records: Vec<R>) {
        let mut seen = HashSet::with_capacity(records.len());
        let before = records.len();
        self.records = records
            .into_iter()
            .filter(|r| seen.insert(r.id().clone()))
            .collect();
        if self.records.len() != before {
            tracing::warn!(
                collection = R::COLLECTION,
                dropped = before - self.records.len(),
                "snapshot contained duplicate ids"
            );
        }
    }

    /// Add a record. If its id is already present, the existing record is
    /// replaced and moved to `position`.
    pub fn insert(&mut self, record: R, position: Position) {
        self.records.retain(|r| r.id() != record.id());
        let index = match position {
            Position::Head => 0,
            Position::Tail => self.records.len(),
            Position::Index(i) => i.min(self.records.len()),
        };
        self.records.insert(index, record);
    }

    /// Replace the record with the same id in place, or append it.
    pub fn upsert(&mut self, record: R) {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    /// Remove records by id, returning them in collection order with their
    /// former indexes. Unknown ids are ignored.
    pub fn remove(&mut self, ids: &[R::Id]) -> Vec<Removed<R>> {
        let wanted: HashSet<&R::Id> = ids.iter().collect();
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.records.len());

        for (index, record) in std::mem::take(&mut self.records).into_iter().enumerate() {
            if wanted.contains(record.id()) {
                removed.push(Removed { index, record });
            } else {
                kept.push(record);
            }
        }

        self.records = kept;
        removed
    }

    /// Get a record by id.
    pub fn get(&self, id: &R::Id) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Check whether a record with this id is present.
    pub fn contains(&self, id: &R::Id) -> bool {
        self.get(id).is_some()
    }

    /// All records, in collection order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// All ids, in collection order.
    pub fn ids(&self) -> Vec<R::Id> {
        self.records.iter().map(|r| r.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
