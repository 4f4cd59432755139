//! MPM Core - View-state engine for live MySQL process monitoring
//!
//! This crate holds the process-list domain: normalized snapshots,
//! sort/filter views, batch selection, resource history, grouping
//! aggregates and the poll scheduling state machine. It performs no I/O;
//! the TUI crate drives it from its event loop.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod history;
pub mod poll;
pub mod process;
pub mod selection;
pub mod view;

// Re-exports for convenience
pub use aggregate::{by_command, by_user, find_blocking, group_counts, Aggregates, GroupCounts};
pub use engine::{Engine, EngineConfig, KillPlan, PollOutcome};
pub use error::{DomainError, DomainResult};
pub use history::{ResourceHistory, ResourceSample, DEFAULT_HISTORY_CAPACITY};
pub use poll::{PollReason, PollScheduler, PollState, PollTicket, DEFAULT_POLL_INTERVAL};
pub use process::{Process, ProcessId, ProcessTime, Snapshot};
pub use selection::SelectionSet;
pub use view::{view, view_indices, SortConfig, SortDirection, SortKey, ViewFilter};
