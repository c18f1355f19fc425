//! In-memory holder for the most recent snapshot per logical key

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::common::types::{Snapshot, SnapshotKey};

/// Holds the most recent accepted snapshot per [`SnapshotKey`].
///
/// Pure data holder: a successful fetch replaces the entry wholesale, a
/// failed fetch leaves the previous entry in place so derived views keep
/// working from last-known-good data. Retention is bounded by
/// [`SnapshotStore::prune_older_than`].
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: HashMap<SnapshotKey, Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Replace the snapshot stored under `key`
    pub fn insert(&mut self, key: SnapshotKey, snapshot: Snapshot) {
        self.inner.insert(key, snapshot);
    }

    pub fn get(&self, key: SnapshotKey) -> Option<&Snapshot> {
        self.inner.get(&key)
    }

    /// When the snapshot under `key` was taken, if present
    pub fn taken_at(&self, key: SnapshotKey) -> Option<DateTime<Utc>> {
        self.inner.get(&key).map(|s| s.taken_at)
    }

    /// Drop snapshots older than `max_age`; returns how many were removed
    pub fn prune_older_than(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, snapshot| now - snapshot.taken_at <= max_age);
        before - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
