use std::sync::Arc;
use arc_swap::ArcSwap;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use crate::core::types::Id;

/// Primary index: id → wire-ready JSON of the entity.
///
/// Each key owns an `ArcSwap` cell, so replacing the value of an existing key
/// only needs a shard read lock and a pointer swap. Readers clone the current
/// snapshot and never see a half-written value.
pub struct SnapshotIndex {
    pub entries: DashMap<Id, ArcSwap<Bytes>>,
}

impl SnapshotIndex {
    pub fn new() -> Self {
        SnapshotIndex {
            entries: DashMap::new(),
        }
    }

    /// Install `value` as the current snapshot for `id`.
    pub fn put(&self, id: Id, value: Bytes) {
        // Fast path: existing key, swap under a shard read lock
        if let Some(cell) = self.entries.get(&id) {
            cell.store(Arc::new(value));
            return;
        }

        match self.entries.entry(id) {
            Entry::Occupied(entry) => entry.get().store(Arc::new(value)),
            Entry::Vacant(entry) => {
                entry.insert(ArcSwap::from_pointee(value));
            }
        }
    }

    pub fn get(&self, id: Id) -> Option<Bytes> {
        self.entries.get(&id).map(|cell| Bytes::clone(&cell.load_full()))
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SnapshotIndex {
    fn default() -> Self {
        Self::new()
    }
}
