//! Batch selection of processes.

use std::collections::BTreeSet;

use crate::process::{ProcessId, Snapshot};

/// Set of process ids the operator intends to act on.
///
/// The tracker never checks ids against the snapshot; rejecting ids
/// that are gone at dispatch time is the dispatcher's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<ProcessId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the id if absent, removes it if present.
    pub fn toggle(&mut self, id: ProcessId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Replaces the selection with exactly the given visible ids.
    pub fn select_all(&mut self, visible: impl IntoIterator<Item = ProcessId>) {
        self.ids = visible.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selected(&self, id: ProcessId) -> bool {
        self.ids.contains(&id)
    }

    /// Removes every id in `ids`, leaving unrelated selections alone.
    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a ProcessId>) {
        for id in ids {
            self.ids.remove(id);
        }
    }

    /// Drops ids that are not present in `snapshot`. Returns how many were dropped.
    pub fn retain_live(&mut self, snapshot: &Snapshot) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| snapshot.contains(*id));
        before.saturating_sub(self.ids.len())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> Vec<ProcessId> {
        self.ids.iter().copied().collect()
    }

    /// Returns true if every id in `visible` is selected and there is at least one.
    pub fn covers(&self, visible: &[ProcessId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id))
    }
}
