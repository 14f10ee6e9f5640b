use std::collections::HashSet;

use crate::RequestId;

/// Requests that currently own a tracker.
///
/// An id is inserted once when its tracker starts and removed once when
/// the tracker retires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSet {
    ids: HashSet<RequestId>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id is already tracked.
    pub fn try_insert(&mut self, id: &RequestId) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.clone())
    }

    pub fn remove(&mut self, id: &RequestId) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
