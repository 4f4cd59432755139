//! Grouping summaries and blocking-session detection.
//!
//! Recomputed from scratch for every snapshot; process lists are small.

use std::collections::HashMap;

use crate::process::{Process, ProcessId, Snapshot};

/// State substring that marks a session as blocked on a lock.
pub const BLOCKING_STATE: &str = "waiting for lock";

/// Per-key process counts, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCounts {
    entries: Vec<(String, usize)>,
}

impl GroupCounts {
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
    }

    /// Sum of all counts; equals the snapshot size.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts processes per key. Keys appear in the order first seen.
pub fn group_counts<F>(snapshot: &Snapshot, key_fn: F) -> GroupCounts
where
    F: Fn(&Process) -> String,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<(String, usize)> = Vec::new();

    for process in snapshot.processes() {
        let key = key_fn(process);
        match positions.get(&key) {
            Some(&pos) => {
                if let Some(entry) = entries.get_mut(pos) {
                    entry.1 = entry.1.saturating_add(1);
                }
            }
            None => {
                positions.insert(key.clone(), entries.len());
                entries.push((key, 1));
            }
        }
    }

    GroupCounts { entries }
}

pub fn by_user(snapshot: &Snapshot) -> GroupCounts {
    group_counts(snapshot, |p| p.user.clone())
}

pub fn by_command(snapshot: &Snapshot) -> GroupCounts {
    group_counts(snapshot, |p| p.command.clone())
}

/// First process (in snapshot order) waiting for a lock.
pub fn find_blocking(snapshot: &Snapshot) -> Option<&Process> {
    snapshot.processes().iter().find(|p| {
        p.state
            .as_deref()
            .is_some_and(|state| state.to_lowercase().contains(BLOCKING_STATE))
    })
}

/// Dashboard summary derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub process_count: usize,
    pub by_user: GroupCounts,
    pub by_command: GroupCounts,
    pub blocking: Option<ProcessId>,
    pub total_cpu: f64,
    pub total_memory: f64,
}

impl Aggregates {
    pub fn compute(snapshot: &Snapshot) -> Self {
        Self {
            process_count: snapshot.len(),
            by_user: by_user(snapshot),
            by_command: by_command(snapshot),
            blocking: find_blocking(snapshot).map(|p| p.id),
            total_cpu: snapshot.processes().iter().map(|p| p.cpu).sum(),
            total_memory: snapshot.processes().iter().map(|p| p.memory).sum(),
        }
    }
}
