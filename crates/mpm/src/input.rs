//! Events and keyboard handling for the mpm TUI.
//!
//! Key handling mutates purely local state (cursor, filter text, sort,
//! selection, popups) directly on [`App`] and returns an [`Action`] for
//! anything that needs I/O or the poll timer.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mpm_core::{KillPlan, PollTicket, ProcessId, Snapshot, SortKey};
use mpm_protocol::{ExecuteResult, KillResponse};

use crate::app::{App, DetailKind, DetailPayload, InputMode, ViewMode};
use crate::error::TuiError;

// ============================================================================
// Event Types
// ============================================================================

/// Everything the main loop reacts to.
///
/// Background tasks report completed requests through these variants;
/// they are applied on the loop task in arrival order.
#[derive(Debug)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// The poll interval elapsed.
    PollTick,

    /// A process-list fetch finished.
    PollCompleted {
        ticket: PollTicket,
        result: Result<Snapshot, TuiError>,
    },

    /// A kill request finished.
    KillCompleted {
        /// Ids that were sent.
        ids: Vec<ProcessId>,
        /// Ids skipped because their sessions had already ended.
        gone: Vec<ProcessId>,
        result: Result<KillResponse, TuiError>,
    },

    /// An executor query finished.
    ExecuteCompleted(Result<ExecuteResult, TuiError>),

    /// A detail popup fetch finished.
    DetailLoaded {
        request_id: u64,
        result: Result<DetailPayload, TuiError>,
    },

    /// The database list was loaded.
    DatabasesLoaded(Result<Vec<String>, TuiError>),
}

// ============================================================================
// Action Types
// ============================================================================

/// Side effects requested by key handling.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// No action required.
    None,

    /// Quit the application.
    Quit,

    /// Pause or resume scheduled polling.
    TogglePolling,

    /// Poll immediately.
    Refresh,

    /// Send a confirmed kill.
    Kill(KillPlan),

    /// Run the executor query.
    Execute {
        query: String,
        db: Option<String>,
    },

    /// Start a detail fetch for the open popup.
    FetchDetail { kind: DetailKind, query: String },

    /// Cancel the detail fetch; the popup is already closed.
    CloseDetail,

    /// Reload the executor's database list.
    LoadDatabases,
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and updates application state accordingly.
///
/// # Key Bindings
///
/// | Key            | Action                                  |
/// |----------------|-----------------------------------------|
/// | `q`, `Ctrl+C`  | Quit                                    |
/// | `j`/`k`        | Move the cursor                         |
/// | `Space`        | Toggle selection of the row             |
/// | `a`            | Select all visible / clear              |
/// | `c`            | Clear selection                         |
/// | `x`            | Kill selected (asks y/n)                |
/// | `/`            | Edit the filter                         |
/// | `1`-`8`        | Sort by column, again to reverse        |
/// | `p`            | Pause/resume polling                    |
/// | `r`            | Refresh now                             |
/// | `Enter`        | Process details and recommendations     |
/// | `e`            | Explain plan for the row's statement    |
/// | `Tab`          | Next view                               |
///
/// In the executor view printable keys edit the query; `Ctrl+D` cycles
/// the database and `Ctrl+E` or `Enter` runs it.
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Action::Quit;
    }

    if app.detail.is_some() {
        return handle_detail_key(key, app);
    }

    match app.input_mode {
        InputMode::ConfirmKill(_) => return handle_confirm_key(key, app),
        InputMode::Filter => return handle_filter_key(key, app),
        InputMode::Normal => {}
    }

    if key.code == KeyCode::Tab {
        app.view = app.view.next();
        return Action::None;
    }

    match app.view {
        ViewMode::Executor => handle_executor_key(key, app),
        ViewMode::Processes | ViewMode::Dashboard => handle_normal_key(key, app),
    }
}

fn handle_normal_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            app.quit();
            Action::Quit
        }

        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            Action::None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
            Action::None
        }

        KeyCode::Char(' ') => {
            app.toggle_at_cursor();
            app.select_next();
            Action::None
        }
        KeyCode::Char('a') => {
            app.toggle_select_all();
            Action::None
        }
        KeyCode::Char('c') => {
            app.engine.clear_selection();
            Action::None
        }
        KeyCode::Char('x') => {
            app.begin_kill();
            Action::None
        }

        KeyCode::Char('/') => {
            app.input_mode = InputMode::Filter;
            Action::None
        }
        KeyCode::Esc => {
            app.engine.clear_filter();
            app.clamp_cursor();
            Action::None
        }
        KeyCode::Char(c @ '1'..='8') => {
            let column = c.to_digit(10).map(|d| d as usize).unwrap_or(0);
            if let Some(sort_key) = SortKey::from_column(column) {
                app.engine.request_sort(sort_key);
            }
            Action::None
        }

        KeyCode::Char('p') | KeyCode::Char('P') => Action::TogglePolling,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Refresh,

        KeyCode::Enter => open_detail(app, DetailKind::Recommendations),
        KeyCode::Char('e') => open_detail(app, DetailKind::Explain),

        _ => Action::None,
    }
}

fn open_detail(app: &mut App, kind: DetailKind) -> Action {
    match app.open_detail(kind) {
        Some(query) => Action::FetchDetail { kind, query },
        None => Action::None,
    }
}

fn handle_detail_key(key: KeyEvent, app: &mut App) -> Action {
    let switch_to = match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
            app.close_detail();
            return Action::CloseDetail;
        }
        KeyCode::Char('e') => DetailKind::Explain,
        KeyCode::Char('r') => DetailKind::Recommendations,
        _ => return Action::None,
    };
    match app.switch_detail(switch_to) {
        Some(query) => Action::FetchDetail {
            kind: switch_to,
            query,
        },
        None => Action::None,
    }
}

fn handle_confirm_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.confirm_kill().map_or(Action::None, Action::Kill)
        }
        _ => {
            let _ = app.take_kill_plan();
            app.notify("Kill cancelled");
            Action::None
        }
    }
}

fn handle_filter_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Enter => app.input_mode = InputMode::Normal,
        KeyCode::Esc => {
            app.engine.clear_filter();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => app.engine.pop_filter_char(),
        KeyCode::Char(c) => app.engine.push_filter_char(c),
        _ => {}
    }
    app.clamp_cursor();
    Action::None
}

fn handle_executor_key(key: KeyEvent, app: &mut App) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('d') if ctrl => {
            if app.executor.databases.is_empty() {
                return Action::LoadDatabases;
            }
            app.executor.cycle_database();
            Action::None
        }
        KeyCode::Char('e') if ctrl => execute(app),
        KeyCode::Char('l') if ctrl => {
            app.executor.query.clear();
            Action::None
        }
        KeyCode::Enter => execute(app),
        KeyCode::Esc => {
            app.view = ViewMode::Processes;
            Action::None
        }
        KeyCode::Backspace => {
            app.executor.query.pop();
            Action::None
        }
        KeyCode::Char(c) if !ctrl => {
            app.executor.query.push(c);
            Action::None
        }
        _ => Action::None,
    }
}

fn execute(app: &mut App) -> Action {
    match app.begin_execute() {
        Some((query, db)) => Action::Execute { query, db },
        None => Action::None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ExecutorOutput;
    use chrono::Utc;
    use mpm_core::{Process, SortDirection};

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, code: KeyCode) -> Action {
        handle_key_event(key_event(code), app)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn process(id: u64, user: &str, info: Option<&str>) -> Process {
        Process {
            id: ProcessId::new(id),
            user: user.to_string(),
            command: "Query".to_string(),
            info: info.map(str::to_string),
            ..Default::default()
        }
    }

    fn app_with(processes: Vec<Process>) -> App {
        let mut app = App::default();
        apply_snapshot(&mut app, processes);
        app
    }

    fn apply_snapshot(app: &mut App, processes: Vec<Process>) {
        let ticket = app.engine.request_refresh();
        let snapshot = Snapshot::new(processes, Utc::now()).unwrap();
        let outcome = app.engine.resolve_poll(&ticket, Ok::<_, TuiError>(snapshot));
        app.on_poll_outcome(&outcome);
    }

    fn sample_app() -> App {
        app_with(vec![
            process(1, "root", None),
            process(2, "app", Some("SELECT * FROM orders")),
            process(3, "repl", None),
        ])
    }

    #[test]
    fn test_quit_keys() {
        let mut app = sample_app();
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::Quit);
        assert!(app.should_quit);

        let mut app = sample_app();
        app.view = ViewMode::Executor;
        assert_eq!(handle_key_event(ctrl('c'), &mut app), Action::Quit);
    }

    #[test]
    fn test_space_toggles_and_advances() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char(' ')), &mut app);
        assert!(app.engine.is_selected(ProcessId::new(1)));
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn test_sort_keys() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char('2')), &mut app);
        assert_eq!(app.engine.sort().key, SortKey::User);
        let _ = handle_key_event(key_event(KeyCode::Char('2')), &mut app);
        assert_eq!(app.engine.sort().direction, SortDirection::Desc);
    }

    #[test]
    fn test_filter_mode_editing() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char('/')), &mut app);
        assert_eq!(app.input_mode, InputMode::Filter);
        for c in "rep".chars() {
            let _ = handle_key_event(key_event(KeyCode::Char(c)), &mut app);
        }
        assert_eq!(app.engine.visible_ids(), vec![ProcessId::new(3)]);
        // 'q' is text while filtering
        let _ = handle_key_event(key_event(KeyCode::Char('q')), &mut app);
        assert!(!app.should_quit);
        let _ = handle_key_event(key_event(KeyCode::Esc), &mut app);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.engine.filter().is_empty());
    }

    #[test]
    fn test_kill_requires_confirmation() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char(' ')), &mut app);
        assert_eq!(press(&mut app, KeyCode::Char('x')), Action::None);
        match handle_key_event(key_event(KeyCode::Char('y')), &mut app) {
            Action::Kill(plan) => assert_eq!(plan.live, vec![ProcessId::new(1)]),
            other => panic!("expected kill, got {other:?}"),
        }
    }

    #[test]
    fn test_kill_confirm_skips_sessions_that_ended_during_prompt() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char('a')), &mut app);
        let _ = handle_key_event(key_event(KeyCode::Char('x')), &mut app);

        apply_snapshot(&mut app, vec![process(1, "root", None)]);
        assert_eq!(app.engine.selection().ids(), vec![ProcessId::new(1)]);

        match handle_key_event(key_event(KeyCode::Char('y')), &mut app) {
            Action::Kill(plan) => {
                assert_eq!(plan.live, vec![ProcessId::new(1)]);
                assert_eq!(plan.gone, vec![ProcessId::new(2), ProcessId::new(3)]);
            }
            other => panic!("expected kill, got {other:?}"),
        }
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_kill_confirm_with_no_live_targets_is_not_dispatched() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char(' ')), &mut app);
        let _ = handle_key_event(key_event(KeyCode::Char('x')), &mut app);

        apply_snapshot(&mut app, vec![process(3, "repl", None)]);

        assert_eq!(press(&mut app, KeyCode::Char('y')), Action::None);
        assert_eq!(app.input_mode, InputMode::Normal);
        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.level, crate::app::NoticeLevel::Error);
    }

    #[test]
    fn test_kill_cancelled() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Char('a')), &mut app);
        let _ = handle_key_event(key_event(KeyCode::Char('x')), &mut app);
        assert_eq!(press(&mut app, KeyCode::Char('n')), Action::None);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.engine.selection().len(), 3);
    }

    #[test]
    fn test_polling_keys() {
        let mut app = sample_app();
        assert_eq!(press(&mut app, KeyCode::Char('p')), Action::TogglePolling);
        assert_eq!(press(&mut app, KeyCode::Char('r')), Action::Refresh);
    }

    #[test]
    fn test_detail_open_and_close() {
        let mut app = sample_app();
        app.cursor = 1;
        let action = handle_key_event(key_event(KeyCode::Enter), &mut app);
        assert_eq!(
            action,
            Action::FetchDetail {
                kind: DetailKind::Recommendations,
                query: "SELECT * FROM orders".to_string()
            }
        );
        let action = handle_key_event(key_event(KeyCode::Char('e')), &mut app);
        assert!(matches!(
            action,
            Action::FetchDetail {
                kind: DetailKind::Explain,
                ..
            }
        ));
        assert_eq!(press(&mut app, KeyCode::Esc), Action::CloseDetail);
        assert!(app.detail.is_none());
    }

    #[test]
    fn test_detail_without_query_fetches_nothing() {
        let mut app = sample_app();
        assert_eq!(press(&mut app, KeyCode::Enter), Action::None);
        assert!(app.detail.is_some());
    }

    #[test]
    fn test_executor_typing_and_execute() {
        let mut app = sample_app();
        let _ = handle_key_event(key_event(KeyCode::Tab), &mut app);
        let _ = handle_key_event(key_event(KeyCode::Tab), &mut app);
        assert_eq!(app.view, ViewMode::Executor);

        for c in "SELECT 1".chars() {
            let _ = handle_key_event(key_event(KeyCode::Char(c)), &mut app);
        }
        assert_eq!(app.executor.query, "SELECT 1");
        assert_eq!(
            handle_key_event(ctrl('e'), &mut app),
            Action::Execute {
                query: "SELECT 1".to_string(),
                db: None
            }
        );
        assert_eq!(app.executor.output, ExecutorOutput::Running);
    }

    #[test]
    fn test_executor_database_cycle_loads_list_first() {
        let mut app = sample_app();
        app.view = ViewMode::Executor;
        assert_eq!(handle_key_event(ctrl('d'), &mut app), Action::LoadDatabases);
        app.executor.set_databases(vec!["shop".to_string()]);
        assert_eq!(handle_key_event(ctrl('d'), &mut app), Action::None);
        assert_eq!(app.executor.database(), Some("shop"));
    }
}
