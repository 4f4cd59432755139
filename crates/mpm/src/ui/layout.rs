//! Layout helpers for the MPM TUI.
//!
//! Provides the main application layout and popup positioning.

use ratatui::layout::{Constraint, Direction, Flex, Layout, Rect};

/// Main application layout areas.
///
/// The TUI is divided into three vertical sections:
/// - Header (3 lines): Title, poll state and notices
/// - Body (fills remaining): The active view
/// - Footer (3 lines): Keybinding help or the filter prompt
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub body: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let [header, body, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .areas(area);

        Self {
            header,
            body,
            footer,
        }
    }
}

/// Returns a rectangle centered in `area`, sized in percent of it.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(row);
    cell
}
