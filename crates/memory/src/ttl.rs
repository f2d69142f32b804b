//! Expiry index for efficient cleanup of expired documents
//!
//! Documents expire lazily: every read checks the document's own deadline.
//! Scans (view builds, query scans, flush) first sweep this index so they
//! never walk documents that are already dead.
//!
//! - Maps expiry deadline → Set<key> using BTreeMap for sorted order
//! - `take_expired()` drains every key whose deadline has passed
//! - O(expired count) instead of O(total documents)

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Expiry index: deadline → keys
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    index: BTreeMap<DateTime<Utc>, HashSet<String>>,
}

impl ExpiryIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }

    /// Track `key` as expiring at `deadline`
    pub fn insert(&mut self, deadline: DateTime<Utc>, key: &str) {
        self.index
            .entry(deadline)
            .or_default()
            .insert(key.to_string());
    }

    /// Stop tracking `key` at `deadline`
    ///
    /// Used when a document is removed or rewritten with a different expiry.
    /// If the set becomes empty, removes the deadline entry entirely.
    pub fn remove(&mut self, deadline: DateTime<Utc>, key: &str) {
        if let Some(keys) = self.index.get_mut(&deadline) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&deadline);
            }
        }
    }

    /// Remove and return every `(deadline, key)` with `deadline <= now`
    pub fn take_expired(&mut self, now: DateTime<Utc>) -> Vec<(DateTime<Utc>, String)> {
        let expired: Vec<DateTime<Utc>> = self.index.range(..=now).map(|(ts, _)| *ts).collect();

        let mut taken = Vec::new();
        for deadline in expired {
            if let Some(keys) = self.index.remove(&deadline) {
                taken.extend(keys.into_iter().map(|k| (deadline, k)));
            }
        }
        taken
    }

    /// Total tracked keys
    pub fn len(&self) -> usize {
        self.index.values().map(HashSet::len).sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.index.clear();
    }
}
