//! Application state for the mpm TUI.
//!
//! `App` wraps the view-state [`Engine`] with everything that only matters
//! to the terminal front end: the active view, the row cursor, popups, the
//! query executor and transient notices.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mpm_core::{DomainError, Engine, EngineConfig, KillPlan, PollOutcome, Process, ProcessId};
use mpm_protocol::{cell_text, ExecuteResult, ExplainResponse, RecommendResponse};

use crate::error::TuiError;

/// How long a notice stays in the header.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

// ============================================================================
// View State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Processes,
    Dashboard,
    Executor,
}

impl ViewMode {
    pub fn next(self) -> Self {
        match self {
            Self::Processes => Self::Dashboard,
            Self::Dashboard => Self::Executor,
            Self::Executor => Self::Processes,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Processes => "Processes",
            Self::Dashboard => "Dashboard",
            Self::Executor => "Query Executor",
        }
    }
}

/// What keystrokes currently mean.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the filter box.
    Filter,
    /// Waiting for y/n on a kill.
    ConfirmKill(KillPlan),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    created: Instant,
}

impl Notice {
    fn new(text: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            text: text.into(),
            level,
            created: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.created.elapsed() >= NOTICE_TTL
    }
}

// ============================================================================
// Detail Popup
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Recommendations,
    Explain,
}

/// Result of a detail fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailPayload {
    Recommendations(RecommendResponse),
    Explain(ExplainResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailContent {
    /// The process has no statement to analyze.
    NoQuery,
    Loading,
    Recommendations(Vec<String>),
    Explain(ExplainResponse),
    Failed(String),
}

/// Popup describing one process.
///
/// Holds a copy of the process so it stays readable after the session ends.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub process: Process,
    pub kind: DetailKind,
    pub request_id: Option<u64>,
    pub content: DetailContent,
}

impl DetailView {
    pub fn query(&self) -> Option<&str> {
        self.process.query_text()
    }
}

// ============================================================================
// Query Executor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExecutorOutput {
    #[default]
    Idle,
    Running,
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Message(String),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutorState {
    pub query: String,
    pub databases: Vec<String>,
    db_index: Option<usize>,
    pub output: ExecutorOutput,
}

impl ExecutorState {
    /// Selected target database; `None` means the backend default.
    pub fn database(&self) -> Option<&str> {
        self.db_index
            .and_then(|idx| self.databases.get(idx))
            .map(String::as_str)
    }

    /// Cycles default → first database → ... → last → default.
    pub fn cycle_database(&mut self) {
        self.db_index = match self.db_index {
            None if !self.databases.is_empty() => Some(0),
            Some(idx) if idx.saturating_add(1) < self.databases.len() => {
                Some(idx.saturating_add(1))
            }
            _ => None,
        };
    }

    /// Replaces the database list, keeping the selection by name.
    pub fn set_databases(&mut self, databases: Vec<String>) {
        let current = self.database().map(str::to_string);
        self.databases = databases;
        self.db_index = current.and_then(|name| self.databases.iter().position(|d| *d == name));
    }

    pub fn is_running(&self) -> bool {
        self.output == ExecutorOutput::Running
    }

    pub fn begin(&mut self) {
        self.output = ExecutorOutput::Running;
    }

    pub fn finish(&mut self, result: Result<ExecuteResult, TuiError>) {
        self.output = match result {
            Ok(ExecuteResult::Message { message }) => ExecutorOutput::Message(message),
            Ok(ExecuteResult::Rows { columns, data }) => {
                let rows = data
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|col| row.get(col).map(cell_text).unwrap_or_default())
                            .collect()
                    })
                    .collect();
                ExecutorOutput::Rows { columns, rows }
            }
            Err(e) => ExecutorOutput::Failed(e.to_string()),
        };
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.output = ExecutorOutput::Failed(message.into());
    }
}

// ============================================================================
// Application
// ============================================================================

/// Core application state for the mpm TUI.
#[derive(Debug)]
pub struct App {
    pub engine: Engine,
    pub view: ViewMode,
    pub input_mode: InputMode,
    /// Position of the highlighted row in the visible list.
    pub cursor: usize,
    pub detail: Option<DetailView>,
    pub executor: ExecutorState,
    pub notice: Option<Notice>,
    /// Last poll failure, cleared by the next applied snapshot.
    pub poll_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl App {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config),
            view: ViewMode::default(),
            input_mode: InputMode::default(),
            cursor: 0,
            detail: None,
            executor: ExecutorState::default(),
            notice: None,
            poll_error: None,
            last_update: None,
            should_quit: false,
        }
    }

    // ------------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------------

    /// Process under the cursor.
    pub fn cursor_process(&self) -> Option<&Process> {
        self.engine.visible_at(self.cursor)
    }

    /// Moves the cursor down, wrapping around.
    pub fn select_next(&mut self) {
        let count = self.engine.visible_len();
        if count == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add(1) % count;
    }

    /// Moves the cursor up, wrapping around.
    pub fn select_previous(&mut self) {
        let count = self.engine.visible_len();
        if count == 0 {
            self.cursor = 0;
        } else if self.cursor == 0 {
            self.cursor = count.saturating_sub(1);
        } else {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    /// Keeps the cursor inside the visible list after it shrinks.
    pub fn clamp_cursor(&mut self) {
        let count = self.engine.visible_len();
        if count == 0 {
            self.cursor = 0;
        } else if self.cursor >= count {
            self.cursor = count.saturating_sub(1);
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn toggle_at_cursor(&mut self) {
        if let Some(id) = self.cursor_process().map(|p| p.id) {
            self.engine.toggle_selection(id);
        }
    }

    /// Selects every visible row, or clears when they already are.
    pub fn toggle_select_all(&mut self) {
        if self.engine.all_visible_selected() {
            self.engine.clear_selection();
        } else {
            self.engine.select_all_visible();
        }
    }

    // ------------------------------------------------------------------------
    // Kill confirmation
    // ------------------------------------------------------------------------

    /// Plans a kill of the selection and asks for confirmation.
    pub fn begin_kill(&mut self) {
        match self.engine.plan_kill_selected() {
            Ok(plan) => self.input_mode = InputMode::ConfirmKill(plan),
            Err(e) => self.notify_error(e.to_string()),
        }
    }

    /// Leaves confirmation mode, returning the plan if there was one.
    pub fn take_kill_plan(&mut self) -> Option<KillPlan> {
        match std::mem::take(&mut self.input_mode) {
            InputMode::ConfirmKill(plan) => Some(plan),
            other => {
                self.input_mode = other;
                None
            }
        }
    }

    /// Leaves confirmation mode and re-plans the confirmed ids against the
    /// current snapshot. Sessions that ended while the prompt was open move
    /// to `gone`; if none are left, the error is shown and `None` returned.
    pub fn confirm_kill(&mut self) -> Option<KillPlan> {
        let confirmed = self.take_kill_plan()?;
        let ids: Vec<ProcessId> = confirmed
            .live
            .iter()
            .chain(&confirmed.gone)
            .copied()
            .collect();
        match self.engine.plan_kill(&ids) {
            Ok(plan) => Some(plan),
            Err(e) => {
                self.notify_error(e.to_string());
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------------

    /// Updates front-end state after a poll ticket resolves.
    pub fn on_poll_outcome(&mut self, outcome: &PollOutcome<TuiError>) {
        match outcome {
            PollOutcome::Applied { .. } => {
                self.poll_error = None;
                self.last_update = Some(Utc::now());
                self.clamp_cursor();
            }
            PollOutcome::Failed(e) => {
                let text = e.to_string();
                self.notify_error(format!("Refresh failed: {text}"));
                self.poll_error = Some(text);
            }
            PollOutcome::Stale => {}
        }
    }

    pub fn is_live(&self) -> bool {
        self.engine.scheduler().is_running()
    }

    // ------------------------------------------------------------------------
    // Detail popup
    // ------------------------------------------------------------------------

    /// Opens the popup for the process under the cursor.
    ///
    /// Returns the statement to analyze when a fetch should start.
    pub fn open_detail(&mut self, kind: DetailKind) -> Option<String> {
        let process = self.cursor_process()?.clone();
        let query = process.query_text().map(str::to_string);
        self.detail = Some(DetailView {
            process,
            kind,
            request_id: None,
            content: if query.is_some() {
                DetailContent::Loading
            } else {
                DetailContent::NoQuery
            },
        });
        query
    }

    /// Switches the open popup to another kind, keeping its process.
    pub fn switch_detail(&mut self, kind: DetailKind) -> Option<String> {
        let detail = self.detail.as_mut()?;
        if detail.kind == kind {
            return None;
        }
        detail.kind = kind;
        detail.request_id = None;
        let query = detail.query().map(str::to_string);
        detail.content = if query.is_some() {
            DetailContent::Loading
        } else {
            DetailContent::NoQuery
        };
        query
    }

    pub fn attach_detail_request(&mut self, request_id: u64) {
        if let Some(detail) = self.detail.as_mut() {
            detail.request_id = Some(request_id);
        }
    }

    /// Fills the popup if `request_id` is still the one it waits for.
    ///
    /// Returns false when the result is late and was dropped.
    pub fn resolve_detail(
        &mut self,
        request_id: u64,
        result: Result<DetailPayload, TuiError>,
    ) -> bool {
        let Some(detail) = self.detail.as_mut() else {
            return false;
        };
        if detail.request_id != Some(request_id) {
            return false;
        }
        detail.content = match result {
            Ok(DetailPayload::Recommendations(resp)) => {
                DetailContent::Recommendations(resp.recommendations)
            }
            Ok(DetailPayload::Explain(resp)) => DetailContent::Explain(resp),
            Err(e) => DetailContent::Failed(e.to_string()),
        };
        true
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    // ------------------------------------------------------------------------
    // Executor
    // ------------------------------------------------------------------------

    /// Validates the executor query and marks it running.
    ///
    /// Returns the `(query, database)` to send.
    pub fn begin_execute(&mut self) -> Option<(String, Option<String>)> {
        if self.executor.is_running() {
            return None;
        }
        let query = self.executor.query.trim().to_string();
        if query.is_empty() {
            self.executor.fail(DomainError::EmptyQuery.to_string());
            return None;
        }
        self.executor.begin();
        Some((query, self.executor.database().map(str::to_string)))
    }

    // ------------------------------------------------------------------------
    // Notices / lifecycle
    // ------------------------------------------------------------------------

    pub fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::new(text, NoticeLevel::Info));
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice::new(text, NoticeLevel::Error));
    }

    /// Drops expired notices. Called once per loop iteration.
    pub fn tick(&mut self) {
        if self.notice.as_ref().is_some_and(Notice::is_expired) {
            self.notice = None;
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

// ============================================================================
// Tests
// ============================================================================
