//! Process table widget for the MPM TUI.
//!
//! One row per visible session in the engine's sort/filter order, with a
//! selection checkbox and the eight process-list columns.

use mpm_core::{Process, SortConfig, SortKey};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::theme::{command_color, row_background};

const COLUMN_WIDTHS: [Constraint; 9] = [
    Constraint::Length(3),
    Constraint::Length(8),
    Constraint::Length(12),
    Constraint::Length(18),
    Constraint::Length(12),
    Constraint::Length(10),
    Constraint::Length(6),
    Constraint::Length(20),
    Constraint::Min(10),
];

/// Renders the process table into `area`.
pub fn render_process_table(frame: &mut Frame, area: Rect, app: &App) {
    let visible = app.engine.visible();
    let title = if app.engine.filter().is_empty() {
        format!(" Processes ({}) ", visible.len())
    } else {
        format!(
            " Processes ({} of {}) ",
            visible.len(),
            app.engine.snapshot().len()
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::White));

    if visible.is_empty() {
        frame.render_widget(empty_state(app).block(block), area);
        return;
    }

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(idx, process)| {
            process_row(
                process,
                app.engine.is_selected(process.id),
                idx == app.cursor,
            )
        })
        .collect();

    let table = Table::new(rows, COLUMN_WIDTHS)
        .header(header_row(app.engine.sort()))
        .block(block)
        .column_spacing(1);

    let mut state = TableState::default().with_selected(Some(app.cursor));
    frame.render_stateful_widget(table, area, &mut state);
}

/// Column headers with the sort arrow on the active column.
fn header_row(sort: &SortConfig) -> Row<'static> {
    let mut cells = vec![Cell::from("")];
    for (idx, key) in SortKey::ALL.iter().enumerate() {
        let mut label = format!("{}{}", idx.saturating_add(1), key.label());
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if *key == sort.key {
            label.push_str(sort.direction.arrow());
            style = style.fg(Color::Cyan);
        }
        cells.push(Cell::from(label).style(style));
    }
    Row::new(cells).style(Style::default().add_modifier(Modifier::UNDERLINED))
}

fn process_row(process: &Process, is_selected: bool, is_cursor: bool) -> Row<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let checkbox = if is_selected { "[x]" } else { "[ ]" };

    let cells = vec![
        Cell::from(Span::styled(
            checkbox,
            Style::default()
                .fg(if is_selected { Color::Yellow } else { Color::DarkGray })
                .add_modifier(Modifier::BOLD),
        )),
        Cell::from(process.id.to_string()),
        Cell::from(truncate_string(&process.user, 12)),
        Cell::from(Span::styled(truncate_string(&process.host, 18), dim)),
        Cell::from(match process.db.as_deref() {
            Some(db) => Span::raw(truncate_string(db, 12)),
            None => Span::styled("NULL", dim),
        }),
        Cell::from(Span::styled(
            truncate_string(&process.command, 10),
            Style::default().fg(command_color(&process.command)),
        )),
        Cell::from(process.time.to_string()),
        Cell::from(truncate_string(process.state.as_deref().unwrap_or(""), 20)),
        Cell::from(single_line(process.info.as_deref().unwrap_or(""))),
    ];

    let mut style = Style::default();
    if let Some(bg) = row_background(process.is_waiting(), is_cursor) {
        style = style.bg(bg);
    }
    if is_cursor {
        style = style.add_modifier(Modifier::BOLD);
    }
    Row::new(cells).style(style)
}

/// Collapses whitespace so multi-line statements fit one row.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates a string to the specified maximum display width.
///
/// If truncated, appends "..." to indicate truncation.
/// Handles UTF-8 multi-byte characters safely by counting chars, not bytes.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn empty_state(app: &App) -> Paragraph<'static> {
    let message = if app.last_update.is_none() {
        match &app.poll_error {
            Some(error) => Line::from(Span::styled(
                format!("Cannot reach backend: {error}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            None => Line::from(Span::styled(
                "Loading process list...",
                Style::default().fg(Color::Yellow),
            )),
        }
    } else if !app.engine.filter().is_empty() {
        Line::from(Span::styled(
            format!("No processes match \"{}\"", app.engine.filter().as_str()),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::from(Span::styled(
            "No active sessions",
            Style::default().fg(Color::DarkGray),
        ))
    };
    Paragraph::new(vec![Line::from(""), message])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TuiError;
    use chrono::Utc;
    use mpm_core::{ProcessId, Snapshot};
    use ratatui::{backend::TestBackend, Terminal};

    fn render_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(160, 12)).unwrap();
        terminal
            .draw(|frame| render_process_table(frame, frame.area(), app))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn loaded_app() -> App {
        let mut app = App::default();
        let processes = vec![
            Process {
                id: ProcessId::new(11),
                user: "app".to_string(),
                host: "10.0.0.5:5123".to_string(),
                db: Some("shop".to_string()),
                command: "Query".to_string(),
                state: Some("Waiting for table metadata lock".to_string()),
                info: Some("ALTER TABLE orders\n  ADD COLUMN note TEXT".to_string()),
                ..Default::default()
            },
            Process {
                id: ProcessId::new(12),
                user: "repl".to_string(),
                command: "Binlog Dump".to_string(),
                ..Default::default()
            },
        ];
        let ticket = app.engine.request_refresh();
        let snapshot = Snapshot::new(processes, Utc::now()).unwrap();
        let outcome = app.engine.resolve_poll(&ticket, Ok::<_, TuiError>(snapshot));
        app.on_poll_outcome(&outcome);
        app
    }

    #[test]
    fn test_renders_rows_and_sort_arrow() {
        let mut app = loaded_app();
        app.engine.toggle_selection(ProcessId::new(12));
        let text = render_text(&app);
        assert!(text.contains("1Id▲"));
        assert!(text.contains("ALTER TABLE orders ADD COLUMN note TEXT"));
        assert!(text.contains("[x]"));
        assert!(text.contains("NULL"));
    }

    #[test]
    fn test_empty_states() {
        let app = App::default();
        assert!(render_text(&app).contains("Loading process list..."));

        let mut app = loaded_app();
        app.engine.set_filter("nothing-matches");
        assert!(render_text(&app).contains("No processes match"));
    }

    #[test]
    fn test_truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_string_very_short_max() {
        assert_eq!(truncate_string("hello", 2), "he");
    }

    #[test]
    fn test_truncate_string_utf8_multibyte() {
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(
            single_line("SELECT *\n  FROM t\tWHERE x"),
            "SELECT * FROM t WHERE x"
        );
    }
}
