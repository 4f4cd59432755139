//! Sorting and filtering of the process list.
//!
//! Everything here is a pure function of `(Snapshot, ViewFilter, SortConfig)`.
//! Sorting is stable and the descending direction reverses the comparator,
//! not the output, so equal keys keep their snapshot order either way.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::process::{Process, ProcessTime, Snapshot};

// ============================================================================
// Sort Configuration
// ============================================================================

/// Column the process table can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Id,
    User,
    Host,
    Db,
    Command,
    Time,
    State,
    Info,
}

impl SortKey {
    /// All keys in table column order.
    pub const ALL: [SortKey; 8] = [
        SortKey::Id,
        SortKey::User,
        SortKey::Host,
        SortKey::Db,
        SortKey::Command,
        SortKey::Time,
        SortKey::State,
        SortKey::Info,
    ];

    /// Column header label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::User => "User",
            Self::Host => "Host",
            Self::Db => "Db",
            Self::Command => "Command",
            Self::Time => "Time",
            Self::State => "State",
            Self::Info => "Info",
        }
    }

    /// Key for a 1-based column number, as typed by the operator.
    pub fn from_column(column: usize) -> Option<Self> {
        column
            .checked_sub(1)
            .and_then(|idx| Self::ALL.get(idx))
            .copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Arrow shown next to the sorted column header.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "▲",
            Self::Desc => "▼",
        }
    }
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Applies an operator sort request.
    ///
    /// Requesting the current key flips the direction; any other key
    /// starts over in ascending order.
    pub fn request(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Asc;
        }
    }

    /// Compares two processes under this configuration.
    pub fn compare(&self, a: &Process, b: &Process) -> Ordering {
        let ordering = compare_by_key(self.key, a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare_by_key(key: SortKey, a: &Process, b: &Process) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::User => compare_text(&a.user, &b.user),
        SortKey::Host => compare_text(&a.host, &b.host),
        SortKey::Db => compare_optional(a.db.as_deref(), b.db.as_deref()),
        SortKey::Command => compare_text(&a.command, &b.command),
        SortKey::Time => compare_time(&a.time, &b.time),
        SortKey::State => compare_optional(a.state.as_deref(), b.state.as_deref()),
        SortKey::Info => compare_optional(a.info.as_deref(), b.info.as_deref()),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_optional(a: Option<&str>, b: Option<&str>) -> Ordering {
    compare_text(a.unwrap_or(""), b.unwrap_or(""))
}

// Numeric times order before textual ones.
fn compare_time(a: &ProcessTime, b: &ProcessTime) -> Ordering {
    match (a, b) {
        (ProcessTime::Seconds(x), ProcessTime::Seconds(y)) => x.cmp(y),
        (ProcessTime::Seconds(_), ProcessTime::Text(_)) => Ordering::Less,
        (ProcessTime::Text(_), ProcessTime::Seconds(_)) => Ordering::Greater,
        (ProcessTime::Text(x), ProcessTime::Text(y)) => compare_text(x, y),
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Case-insensitive free-text filter over user, db, command, state and info.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewFilter {
    query: String,
    needle: String,
}

impl ViewFilter {
    pub fn new(query: impl Into<String>) -> Self {
        let mut filter = Self::default();
        filter.set(query);
        filter
    }

    /// Replaces the query text.
    pub fn set(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.needle = self.query.to_lowercase();
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.needle = self.query.to_lowercase();
    }

    pub fn pop(&mut self) {
        self.query.pop();
        self.needle = self.query.to_lowercase();
    }

    pub fn clear(&mut self) {
        self.set(String::new());
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Returns true if any searched field contains the query.
    pub fn matches(&self, process: &Process) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        [
            Some(process.user.as_str()),
            process.db.as_deref(),
            Some(process.command.as_str()),
            process.state.as_deref(),
            process.info.as_deref(),
        ]
        .into_iter()
        .any(|field| field.unwrap_or("").to_lowercase().contains(&self.needle))
    }
}

// ============================================================================
// View
// ============================================================================

/// Snapshot positions of the visible processes, in display order.
pub fn view_indices(snapshot: &Snapshot, filter: &ViewFilter, sort: &SortConfig) -> Vec<usize> {
    let processes = snapshot.processes();
    let mut indices: Vec<usize> = processes
        .iter()
        .enumerate()
        .filter(|(_, p)| filter.matches(p))
        .map(|(idx, _)| idx)
        .collect();

    // `sort_by` is stable, which keeps ties in snapshot order.
    indices.sort_by(|&a, &b| match (processes.get(a), processes.get(b)) {
        (Some(pa), Some(pb)) => sort.compare(pa, pb),
        _ => Ordering::Equal,
    });
    indices
}

/// Ordered, filtered view of a snapshot.
pub fn view<'a>(
    snapshot: &'a Snapshot,
    filter: &ViewFilter,
    sort: &SortConfig,
) -> Vec<&'a Process> {
    let processes = snapshot.processes();
    view_indices(snapshot, filter, sort)
        .into_iter()
        .filter_map(|idx| processes.get(idx))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
