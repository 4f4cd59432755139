//! The live-process view-state engine.
//!
//! `Engine` is the single owner of the current snapshot, sort and filter
//! settings, batch selection, resource history and poll scheduler. Every
//! mutation is a `&mut self` method, so a reader holding `&Engine` always
//! sees a fully applied state. Derived data (visible order, aggregates) is
//! recomputed eagerly whenever an input changes.

use std::time::Duration;

use tracing::debug;

use crate::aggregate::Aggregates;
use crate::error::{DomainError, DomainResult};
use crate::history::{ResourceHistory, DEFAULT_HISTORY_CAPACITY};
use crate::poll::{PollScheduler, PollTicket, DEFAULT_POLL_INTERVAL};
use crate::process::{Process, ProcessId, Snapshot};
use crate::selection::SelectionSet;
use crate::view::{view_indices, SortConfig, SortKey, ViewFilter};

/// Tunables for the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub poll_interval: Duration,
    pub history_capacity: usize,
    /// Drop selected ids that vanished from a newly applied snapshot.
    pub prune_selection: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            prune_selection: true,
        }
    }
}

/// Result of resolving a poll ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<E> {
    /// The snapshot replaced the previous one.
    Applied {
        process_count: usize,
        /// Selected ids dropped because their sessions ended.
        pruned: usize,
    },
    /// The response belonged to a superseded cycle and was ignored.
    Stale,
    /// The request failed; previous state is untouched.
    Failed(E),
}

/// Targets for a kill request after checking them against the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillPlan {
    /// Ids present in the current snapshot; these are sent.
    pub live: Vec<ProcessId>,
    /// Ids whose sessions already ended; these are skipped.
    pub gone: Vec<ProcessId>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    snapshot: Snapshot,
    sort: SortConfig,
    filter: ViewFilter,
    selection: SelectionSet,
    history: ResourceHistory,
    scheduler: PollScheduler,
    aggregates: Aggregates,
    visible: Vec<usize>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            snapshot: Snapshot::empty(),
            sort: SortConfig::default(),
            filter: ViewFilter::default(),
            selection: SelectionSet::new(),
            history: ResourceHistory::new(config.history_capacity),
            scheduler: PollScheduler::new(config.poll_interval),
            aggregates: Aggregates::default(),
            visible: Vec::new(),
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn sort(&self) -> &SortConfig {
        &self.sort
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn history(&self) -> &ResourceHistory {
        &self.history
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    /// Visible processes in display order.
    pub fn visible(&self) -> Vec<&Process> {
        let processes = self.snapshot.processes();
        self.visible
            .iter()
            .filter_map(|&idx| processes.get(idx))
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<ProcessId> {
        self.visible().iter().map(|p| p.id).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Process at a position of the visible list.
    pub fn visible_at(&self, position: usize) -> Option<&Process> {
        self.visible
            .get(position)
            .and_then(|&idx| self.snapshot.processes().get(idx))
    }

    pub fn blocking(&self) -> Option<&Process> {
        self.aggregates
            .blocking
            .and_then(|id| self.snapshot.get(id))
    }

    // ========================================================================
    // Polling
    // ========================================================================

    pub fn resume_polling(&mut self) -> Option<PollTicket> {
        self.scheduler.resume()
    }

    pub fn pause_polling(&mut self) {
        self.scheduler.pause();
    }

    pub fn toggle_polling(&mut self) -> Option<PollTicket> {
        self.scheduler.toggle()
    }

    pub fn poll_tick(&mut self) -> Option<PollTicket> {
        self.scheduler.tick()
    }

    /// Issues an immediate poll outside the regular schedule.
    pub fn request_refresh(&mut self) -> PollTicket {
        self.scheduler.out_of_cycle()
    }

    /// Resolves a poll ticket with the fetched snapshot or the fetch error.
    ///
    /// Stale responses are discarded whether they succeeded or not. A
    /// failed poll leaves the snapshot and the history untouched.
    pub fn resolve_poll<E>(
        &mut self,
        ticket: &PollTicket,
        result: Result<Snapshot, E>,
    ) -> PollOutcome<E> {
        if !self.scheduler.accept(ticket) {
            debug!(
                generation = ticket.generation,
                seq = ticket.seq,
                current_generation = self.scheduler.generation(),
                "Discarding stale poll response"
            );
            return PollOutcome::Stale;
        }

        match result {
            Ok(snapshot) => {
                let pruned = self.apply_snapshot(snapshot);
                PollOutcome::Applied {
                    process_count: self.snapshot.len(),
                    pruned,
                }
            }
            Err(e) => PollOutcome::Failed(e),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> usize {
        self.history.record(&snapshot);
        self.aggregates = Aggregates::compute(&snapshot);
        self.snapshot = snapshot;
        self.refresh_view();

        if self.config.prune_selection {
            self.selection.retain_live(&self.snapshot)
        } else {
            0
        }
    }

    // ========================================================================
    // Sort / filter
    // ========================================================================

    pub fn request_sort(&mut self, key: SortKey) {
        self.sort.request(key);
        self.refresh_view();
    }

    pub fn set_filter(&mut self, query: impl Into<String>) {
        self.filter.set(query);
        self.refresh_view();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.push(c);
        self.refresh_view();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.refresh_view();
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        self.visible = view_indices(&self.snapshot, &self.filter, &self.sort);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn toggle_selection(&mut self, id: ProcessId) {
        self.selection.toggle(id);
    }

    /// Replaces the selection with the currently visible ids.
    pub fn select_all_visible(&mut self) {
        let visible = self.visible_ids();
        self.selection.select_all(visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: ProcessId) -> bool {
        self.selection.is_selected(id)
    }

    /// Returns true if every visible row is selected.
    pub fn all_visible_selected(&self) -> bool {
        self.selection.covers(&self.visible_ids())
    }

    // ========================================================================
    // Kill reconciliation
    // ========================================================================

    /// Splits `ids` into those still running and those already gone.
    ///
    /// # Errors
    ///
    /// - `DomainError::EmptySelection` if `ids` is empty
    /// - `DomainError::NoLiveTargets` if none of them are in the snapshot
    pub fn plan_kill(&self, ids: &[ProcessId]) -> DomainResult<KillPlan> {
        if ids.is_empty() {
            return Err(DomainError::EmptySelection);
        }
        let (live, gone): (Vec<ProcessId>, Vec<ProcessId>) =
            ids.iter().partition(|id| self.snapshot.contains(**id));
        if live.is_empty() {
            return Err(DomainError::NoLiveTargets {
                requested: ids.len(),
            });
        }
        Ok(KillPlan { live, gone })
    }

    /// Plans a kill of the current selection.
    pub fn plan_kill_selected(&self) -> DomainResult<KillPlan> {
        self.plan_kill(&self.selection.ids())
    }

    /// Reconciles a successful kill: deselects the ids and issues a refresh.
    pub fn complete_kill(&mut self, ids: &[ProcessId]) -> PollTicket {
        self.selection.remove_all(ids);
        self.scheduler.out_of_cycle()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
