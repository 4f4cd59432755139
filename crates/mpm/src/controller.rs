//! Event handling for the main loop.
//!
//! The [`Controller`] owns the [`App`] and applies every [`Event`] to it in
//! arrival order, turning key actions into background requests through the
//! [`Dispatcher`] and starting or stopping the poll timer.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use mpm_core::{PollOutcome, PollTicket, ProcessId, Snapshot};
use mpm_protocol::KillResponse;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::dispatch::Dispatcher;
use crate::error::TuiError;
use crate::input::{handle_key_event, Action, Event};
use crate::poll::PollTimer;

/// Whether the main loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Controller {
    app: App,
    dispatcher: Dispatcher,
    timer: PollTimer,
}

impl Controller {
    pub fn new(app: App, dispatcher: Dispatcher, timer: PollTimer) -> Self {
        Self {
            app,
            dispatcher,
            timer,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Loads the first snapshot and, unless `paused`, starts polling.
    pub fn start(&mut self, paused: bool) {
        if paused {
            let ticket = self.app.engine.request_refresh();
            self.dispatcher.poll(ticket);
            self.app.notify("Polling paused, press p to resume");
        } else {
            self.resume();
        }
        self.dispatcher.load_databases();
    }

    fn resume(&mut self) {
        if let Some(ticket) = self.app.engine.resume_polling() {
            info!(generation = ticket.generation, "Polling resumed");
            self.timer.start();
            self.dispatcher.poll(ticket);
        }
    }

    fn pause(&mut self) {
        self.app.engine.pause_polling();
        self.timer.stop();
        info!(
            generation = self.app.engine.scheduler().generation(),
            "Polling paused"
        );
    }

    /// Applies one event.
    pub fn handle_event(&mut self, event: Event) -> Flow {
        match event {
            Event::Key(key) => {
                let action = handle_key_event(key, &mut self.app);
                self.perform(action);
            }
            Event::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
            }
            Event::PollTick => {
                if let Some(ticket) = self.app.engine.poll_tick() {
                    self.dispatcher.poll(ticket);
                }
            }
            Event::PollCompleted { ticket, result } => self.on_poll_completed(ticket, result),
            Event::KillCompleted { ids, gone, result } => {
                self.on_kill_completed(&ids, &gone, result)
            }
            Event::ExecuteCompleted(result) => {
                if let Err(e) = &result {
                    warn!(error = %e, "Query execution failed");
                }
                self.app.executor.finish(result);
            }
            Event::DetailLoaded { request_id, result } => {
                self.dispatcher.detail_finished(request_id);
                if !self.app.resolve_detail(request_id, result) {
                    debug!(request_id, "Discarding detail result for closed view");
                }
            }
            Event::DatabasesLoaded(result) => match result {
                Ok(databases) => {
                    debug!(count = databases.len(), "Loaded database list");
                    self.app.executor.set_databases(databases);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load database list");
                    self.app.notify_error(format!("Could not load databases: {e}"));
                }
            },
        }

        if self.app.should_quit {
            Flow::Quit
        } else {
            Flow::Continue
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Quit => info!("User requested quit"),
            Action::TogglePolling => {
                if self.app.is_live() {
                    self.pause();
                    self.app.notify("Polling paused");
                } else {
                    self.resume();
                    self.app.notify("Polling resumed");
                }
            }
            Action::Refresh => {
                debug!("User requested refresh");
                let ticket = self.app.engine.request_refresh();
                self.dispatcher.poll(ticket);
            }
            Action::Kill(plan) => {
                info!(live = ?plan.live, gone = ?plan.gone, "Killing processes");
                self.dispatcher.kill(plan);
            }
            Action::Execute { query, db } => self.dispatcher.execute(query, db),
            Action::FetchDetail { kind, query } => {
                let request_id = self.dispatcher.fetch_detail(kind, query);
                self.app.attach_detail_request(request_id);
            }
            Action::CloseDetail => self.dispatcher.cancel_detail(),
            Action::LoadDatabases => {
                self.app.notify("Loading databases...");
                self.dispatcher.load_databases();
            }
        }
    }

    fn on_poll_completed(&mut self, ticket: PollTicket, result: Result<Snapshot, TuiError>) {
        let outcome = self.app.engine.resolve_poll(&ticket, result);
        match &outcome {
            PollOutcome::Applied {
                process_count,
                pruned,
            } => {
                debug!(process_count, pruned, seq = ticket.seq, "Applied snapshot");
            }
            PollOutcome::Stale => {
                debug!(
                    generation = ticket.generation,
                    seq = ticket.seq,
                    "Ignored stale snapshot"
                );
            }
            PollOutcome::Failed(e) => {
                warn!(error = %e, reason = ?ticket.reason, "Poll failed");
            }
        }
        self.app.on_poll_outcome(&outcome);
    }

    fn on_kill_completed(
        &mut self,
        ids: &[ProcessId],
        gone: &[ProcessId],
        result: Result<KillResponse, TuiError>,
    ) {
        match result {
            Ok(response) => {
                let ticket = self.app.engine.complete_kill(ids);
                self.dispatcher.poll(ticket);

                for failure in &response.failed {
                    warn!(
                        id = %failure.id,
                        error = %failure.error,
                        "Backend could not kill process"
                    );
                }
                let mut summary = response.summary();
                if !gone.is_empty() {
                    summary.push_str(&format!(", {} already ended", gone.len()));
                }
                info!(killed = ids.len(), skipped = gone.len(), "Kill completed");
                if response.failed.is_empty() {
                    self.app.notify(summary);
                } else {
                    self.app.notify_error(summary);
                }
            }
            Err(e) => {
                warn!(error = %e, ids = ?ids, "Kill request failed");
                self.app.notify_error(format!("Kill failed: {e}"));
            }
        }
    }
}
