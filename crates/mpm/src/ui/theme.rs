//! Shared theme utilities for the MPM TUI.
//!
//! Provides consistent styling across all UI components.

use ratatui::style::{Color, Modifier, Style};

use crate::app::NoticeLevel;

/// Background tint for sessions waiting on a lock or resource.
pub const WAITING_BACKGROUND: Color = Color::Rgb(50, 40, 0);

/// Background of the row under the cursor.
pub const CURSOR_BACKGROUND: Color = Color::Rgb(30, 30, 40);

pub fn key_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

pub fn label_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

pub fn notice_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Error => Color::Red,
    }
}

/// Color for a command column value.
///
/// `Query` is active work, `Sleep` is idle, everything else (replication,
/// daemon threads, `Killed`) stands out.
pub fn command_color(command: &str) -> Color {
    match command {
        "Query" | "Execute" => Color::Blue,
        "Sleep" => Color::DarkGray,
        "Killed" => Color::Red,
        _ => Color::Magenta,
    }
}

/// Returns the row background for a process.
///
/// Waiting outranks the cursor so a blocked session stays visible.
pub fn row_background(is_waiting: bool, is_cursor: bool) -> Option<Color> {
    if is_waiting {
        Some(WAITING_BACKGROUND)
    } else if is_cursor {
        Some(CURSOR_BACKGROUND)
    } else {
        None
    }
}
