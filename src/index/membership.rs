use std::sync::Arc;
use dashmap::DashMap;
use crate::core::types::Id;

/// Secondary index: owner id → visit ids, in insertion order.
///
/// Lists are copy-on-write: a reader holding an `Arc` keeps its view while a
/// writer clones and replaces the list.
pub struct MembershipIndex {
    pub lists: DashMap<Id, Arc<Vec<Id>>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        MembershipIndex {
            lists: DashMap::new(),
        }
    }

    /// Append `member` to the list under `key`.
    pub fn put(&self, key: Id, member: Id) {
        let mut list = self.lists.entry(key).or_default();
        Arc::make_mut(list.value_mut()).push(member);
    }

    pub fn get(&self, key: Id) -> Option<Arc<Vec<Id>>> {
        self.lists.get(&key).map(|list| list.value().clone())
    }

    /// Remove the first occurrence of `member` under `key`, keeping the order
    /// of the remaining ids. No-op if absent.
    pub fn remove(&self, key: Id, member: Id) {
        if let Some(mut list) = self.lists.get_mut(&key) {
            if let Some(position) = list.iter().position(|&m| m == member) {
                Arc::make_mut(list.value_mut()).remove(position);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl Default for MembershipIndex {
    fn default() -> Self {
        Self::new()
    }
}
