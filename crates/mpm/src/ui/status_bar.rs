//! Header and footer status bar widgets for the MPM TUI.
//!
//! The status bar provides:
//! - Header: Application title, poll state, summary and the current notice
//! - Footer: Keybinding hints, the filter prompt or the kill confirmation

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, InputMode, ViewMode};
use crate::ui::theme::{key_style, notice_color};

/// Renders the header bar with title, poll state and summary statistics.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let (status_text, status_style) = poll_status_display(app.is_live(), app.poll_error.is_some());
    let aggregates = app.engine.aggregates();

    let mut stats = format!(
        " | {} process{}",
        aggregates.process_count,
        if aggregates.process_count == 1 { "" } else { "es" }
    );
    if let Some(blocking) = aggregates.blocking {
        stats.push_str(&format!(" | blocking: {blocking}"));
    }
    let selected = app.engine.selection().len();
    if selected > 0 {
        stats.push_str(&format!(" | {selected} selected"));
    }
    if let Some(at) = app.last_update {
        stats.push_str(&format!(" | {}", at.format("%H:%M:%S")));
    }

    let mut spans = vec![
        Span::styled(
            "MPM",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" - {} | ", app.view.title())),
        Span::styled(status_text, status_style),
        Span::styled(stats, Style::default().fg(Color::DarkGray)),
    ];

    if let Some(notice) = &app.notice {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            notice.text.clone(),
            Style::default().fg(notice_color(notice.level)),
        ));
    }

    let border_style = if app.poll_error.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_live() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );

    frame.render_widget(header, area);
}

/// Renders the footer: kill prompt, filter prompt or key hints.
pub fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = match &app.input_mode {
        InputMode::ConfirmKill(plan) => {
            let mut spans = vec![Span::styled(
                format!(" Kill {} process(es)?", plan.live.len()),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )];
            if !plan.gone.is_empty() {
                spans.push(Span::styled(
                    format!(" ({} already ended, skipped)", plan.gone.len()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            spans.push(Span::raw("  "));
            spans.push(Span::styled("y", key_style()));
            spans.push(Span::raw(" confirm  "));
            spans.push(Span::styled("any key", key_style()));
            spans.push(Span::raw(" cancel"));
            Line::from(spans)
        }
        InputMode::Filter => Line::from(vec![
            Span::styled(" /", key_style()),
            Span::raw(app.engine.filter().as_str().to_string()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled("   Enter", key_style()),
            Span::raw(" keep  "),
            Span::styled("Esc", key_style()),
            Span::raw(" clear"),
        ]),
        InputMode::Normal => Line::from(key_hints(app)),
    };

    let footer = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

fn key_hints(app: &App) -> Vec<Span<'static>> {
    let sep_style = Style::default().fg(Color::DarkGray);
    let pairs: &[(&'static str, &'static str)] = if app.detail.is_some() {
        &[("Esc", "close"), ("r", "recommend"), ("e", "explain")]
    } else {
        match app.view {
            ViewMode::Executor => &[
                ("Enter", "run"),
                ("^D", "database"),
                ("^L", "clear"),
                ("Tab", "view"),
                ("Esc", "back"),
            ],
            ViewMode::Processes | ViewMode::Dashboard => &[
                ("j/k", "move"),
                ("space", "select"),
                ("a", "all"),
                ("x", "kill"),
                ("/", "filter"),
                ("1-8", "sort"),
                ("Enter", "detail"),
                ("p", "pause"),
                ("r", "refresh"),
                ("Tab", "view"),
                ("q", "quit"),
            ],
        }
    };

    let mut spans = Vec::with_capacity(pairs.len().saturating_mul(3));
    for (idx, (key, label)) in pairs.iter().enumerate() {
        spans.push(Span::styled(if idx == 0 { " " } else { "  " }, sep_style));
        spans.push(Span::styled(*key, key_style()));
        spans.push(Span::raw(format!(" {label}")));
    }

    if !app.engine.filter().is_empty() && app.view != ViewMode::Executor {
        spans.push(Span::styled("  |  filter: ", sep_style));
        spans.push(Span::styled(
            app.engine.filter().as_str().to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans
}

/// Returns the display text and style for the poll state.
fn poll_status_display(live: bool, failing: bool) -> (&'static str, Style) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match (live, failing) {
        (true, false) => ("Live", bold.fg(Color::Green)),
        (true, true) => ("Live (refresh failing)", bold.fg(Color::Red)),
        (false, _) => ("Paused", bold.fg(Color::Yellow)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_poll_status_display() {
        let (text, style) = poll_status_display(true, false);
        assert_eq!(text, "Live");
        assert_eq!(style.fg, Some(Color::Green));

        let (text, style) = poll_status_display(true, true);
        assert_eq!(text, "Live (refresh failing)");
        assert_eq!(style.fg, Some(Color::Red));

        let (text, _) = poll_status_display(false, true);
        assert_eq!(text, "Paused");
    }

    #[test]
    fn test_footer_shows_filter_prompt() {
        let mut app = App::default();
        app.input_mode = InputMode::Filter;
        app.engine.set_filter("sleep");

        let mut terminal = Terminal::new(TestBackend::new(60, 3)).unwrap();
        terminal
            .draw(|frame| render_footer(frame, frame.area(), &app))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("/sleep"));
    }

    #[test]
    fn test_header_shows_notice() {
        let mut app = App::default();
        app.notify("Killed 2 process(es)");

        let mut terminal = Terminal::new(TestBackend::new(100, 3)).unwrap();
        terminal
            .draw(|frame| render_header(frame, frame.area(), &app))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Paused"));
        assert!(text.contains("Killed 2 process(es)"));
    }
}
