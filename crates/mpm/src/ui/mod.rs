//! UI rendering module for the MPM TUI.
//!
//! This module provides the complete rendering pipeline. It orchestrates
//! the layout and individual widget rendering.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: Title, poll state, summary, notice      |  <- 3 lines
//! +--------------------------------------------------+
//! |  Active view: Processes | Dashboard | Executor   |  <- fills remaining
//! |                                                  |
//! +--------------------------------------------------+
//! |  Footer: Keybinding hints / filter / confirm     |  <- 3 lines
//! +--------------------------------------------------+
//! ```
//!
//! The detail popup is drawn over the active view while open.

pub mod dashboard;
pub mod detail_panel;
pub mod executor;
pub mod layout;
pub mod process_table;
pub mod status_bar;
pub mod theme;

use ratatui::Frame;

use crate::app::{App, ViewMode};
use layout::AppLayout;

pub use dashboard::render_dashboard;
pub use detail_panel::render_detail_popup;
pub use executor::render_executor;
pub use process_table::render_process_table;
pub use status_bar::{render_footer, render_header};

/// Renders the complete TUI interface.
///
/// ```ignore
/// terminal.draw(|frame| {
///     ui::render(frame, &app);
/// })?;
/// ```
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_footer(frame, layout.footer, app);

    match app.view {
        ViewMode::Processes => render_process_table(frame, layout.body, app),
        ViewMode::Dashboard => render_dashboard(frame, layout.body, app),
        ViewMode::Executor => render_executor(frame, layout.body, &app.executor),
    }

    if let Some(detail) = &app.detail {
        render_detail_popup(frame, layout.body, detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DetailKind;
    use crate::error::TuiError;
    use chrono::Utc;
    use mpm_core::{Process, ProcessId, Snapshot};
    use ratatui::{backend::TestBackend, Terminal};

    fn loaded_app() -> App {
        let mut app = App::default();
        let processes = (1..=5)
            .map(|id| Process {
                id: ProcessId::new(id),
                user: format!("user{}", id % 2),
                command: if id == 3 { "Sleep" } else { "Query" }.to_string(),
                info: (id == 1).then(|| "SELECT SLEEP(10)".to_string()),
                cpu: id as f64,
                memory: 1.5,
                ..Default::default()
            })
            .collect();
        let ticket = app.engine.resume_polling().unwrap();
        let snapshot = Snapshot::new(processes, Utc::now()).unwrap();
        let outcome = app.engine.resolve_poll(&ticket, Ok::<_, TuiError>(snapshot));
        app.on_poll_outcome(&outcome);
        app
    }

    fn draw(app: &App) {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
    }

    #[test]
    fn test_render_empty_state() {
        draw(&App::default());
    }

    #[test]
    fn test_render_every_view() {
        let mut app = loaded_app();
        for _ in 0..3 {
            draw(&app);
            app.view = app.view.next();
        }
    }

    #[test]
    fn test_render_with_detail_popup() {
        let mut app = loaded_app();
        app.open_detail(DetailKind::Recommendations);
        assert!(app.detail.is_some());
        draw(&app);
    }

    #[test]
    fn test_render_small_terminal() {
        let app = loaded_app();
        let mut terminal = Terminal::new(TestBackend::new(20, 8)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();
    }
}
