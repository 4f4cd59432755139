//! Process entities and point-in-time snapshots.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Server-assigned connection identifier (`Id` column of the process list).
///
/// Stable for the lifetime of a session; disappears from the next snapshot
/// once the session ends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProcessId(u64);

impl ProcessId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProcessId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Process
// ============================================================================

/// Elapsed time reported for a session.
///
/// MySQL reports whole seconds; other servers (and proxies) sometimes
/// report a preformatted duration string instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessTime {
    Seconds(u64),
    Text(String),
}

impl ProcessTime {
    /// Returns the elapsed seconds, if reported numerically.
    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            Self::Seconds(secs) => Some(*secs),
            Self::Text(_) => None,
        }
    }
}

impl Default for ProcessTime {
    fn default() -> Self {
        Self::Seconds(0)
    }
}

impl fmt::Display for ProcessTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(secs) => write!(f, "{secs}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

/// One live database session, in canonical (normalized) form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub user: String,
    pub host: String,
    pub db: Option<String>,
    pub command: String,
    pub time: ProcessTime,
    pub state: Option<String>,
    /// Statement text currently executing, if any.
    pub info: Option<String>,
    /// Always finite and non-negative.
    pub cpu: f64,
    /// Always finite and non-negative.
    pub memory: f64,
}

impl Process {
    /// Returns the statement text when present and non-blank.
    pub fn query_text(&self) -> Option<&str> {
        self.info
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Returns true if the session state mentions waiting of any kind.
    pub fn is_waiting(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|state| state.to_lowercase().contains("waiting"))
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable, ordered capture of every session at one poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    processes: Vec<Process>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Builds a snapshot, rejecting duplicate process ids.
    pub fn new(processes: Vec<Process>, captured_at: DateTime<Utc>) -> DomainResult<Self> {
        let mut seen = HashSet::with_capacity(processes.len());
        for process in &processes {
            if !seen.insert(process.id) {
                return Err(DomainError::malformed(format!(
                    "duplicate process id {}",
                    process.id
                )));
            }
        }
        Ok(Self {
            processes,
            captured_at,
        })
    }

    /// An empty snapshot, used before the first successful poll.
    pub fn empty() -> Self {
        Self {
            processes: Vec::new(),
            captured_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.get(id).is_some()
    }

    /// Ids in snapshot order.
    pub fn ids(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.processes.iter().map(|p| p.id)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
