//! Process detail popup for the MPM TUI.
//!
//! Shows every field of one session and, below it, either the backend's
//! recommendations for the running statement or its EXPLAIN plan.

use mpm_protocol::{cell_text, ExplainResponse};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use serde_json::{Map, Value};

use crate::app::{DetailContent, DetailKind, DetailView};
use crate::ui::layout::centered_rect;
use crate::ui::process_table::truncate_string;
use crate::ui::theme::label_style;

/// Widest a plan column may get before values are cut.
const PLAN_COLUMN_MAX: usize = 24;

/// Renders the detail popup over `area`.
pub fn render_detail_popup(frame: &mut Frame, area: Rect, detail: &DetailView) {
    let popup = centered_rect(80, 80, area);
    let title = match detail.kind {
        DetailKind::Recommendations => format!(" Process {} - Recommendations ", detail.process.id),
        DetailKind::Explain => format!(" Process {} - Explain ", detail.process.id),
    };
    let border = if matches!(detail.content, DetailContent::Failed(_)) {
        Color::Red
    } else {
        Color::Cyan
    };

    let mut lines = process_lines(detail);
    lines.push(Line::from(""));
    lines.extend(content_lines(detail.kind, &detail.content));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(border)),
        );

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}

fn process_lines(detail: &DetailView) -> Vec<Line<'static>> {
    let process = &detail.process;
    let value_style = Style::default().fg(Color::White);
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {label:<9}"), label_style()),
            Span::styled(value, value_style),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field("User:", process.user.clone()),
        field("Host:", process.host.clone()),
        field(
            "Db:",
            process.db.clone().unwrap_or_else(|| "NULL".to_string()),
        ),
        field("Command:", process.command.clone()),
        field("Time:", process.time.to_string()),
        field("State:", process.state.clone().unwrap_or_default()),
    ];
    if process.cpu > 0.0 || process.memory > 0.0 {
        lines.push(field(
            "Usage:",
            format!("cpu {:.1}  memory {:.1}", process.cpu, process.memory),
        ));
    }
    if process.is_waiting() {
        lines.push(Line::from(Span::styled(
            "  ! Session is waiting",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("  Statement:", label_style())));
    match detail.query() {
        Some(query) => {
            for text in query.lines() {
                lines.push(Line::from(Span::styled(
                    format!("    {text}"),
                    Style::default().fg(Color::Cyan),
                )));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "    NULL",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines
}

fn content_lines(kind: DetailKind, content: &DetailContent) -> Vec<Line<'static>> {
    let heading = match kind {
        DetailKind::Recommendations => "  Recommendations:",
        DetailKind::Explain => "  Execution plan:",
    };
    let dim = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);

    let mut lines = vec![Line::from(Span::styled(heading, label_style()))];
    match content {
        DetailContent::NoQuery => {
            lines.push(Line::from(Span::styled("    No statement to analyze", dim)));
        }
        DetailContent::Loading => {
            lines.push(Line::from(Span::styled("    Loading...", dim)));
        }
        DetailContent::Recommendations(items) if items.is_empty() => {
            lines.push(Line::from(Span::styled("    Nothing to recommend", dim)));
        }
        DetailContent::Recommendations(items) => {
            lines.extend(items.iter().map(|item| {
                Line::from(vec![
                    Span::styled("    * ", Style::default().fg(Color::Yellow)),
                    Span::raw(item.clone()),
                ])
            }));
        }
        DetailContent::Explain(explain) => lines.extend(explain_lines(explain)),
        DetailContent::Failed(error) => {
            lines.push(Line::from(Span::styled(
                format!("    {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn explain_lines(explain: &ExplainResponse) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = explain
        .interpretation
        .iter()
        .map(|hint| {
            Line::from(vec![
                Span::styled("    * ", Style::default().fg(Color::Yellow)),
                Span::raw(hint.clone()),
            ])
        })
        .collect();

    if explain.plan.is_empty() {
        lines.push(Line::from(Span::styled(
            "    (empty plan)",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    lines.push(Line::from(""));
    let (header, rows) = plan_table(&explain.plan);
    lines.push(Line::from(Span::styled(
        format!("    {header}"),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    )));
    lines.extend(rows.into_iter().map(|row| Line::from(format!("    {row}"))));
    lines
}

/// Lays out plan rows as fixed-width text columns.
///
/// Columns come from the first row in its key order; later rows missing a
/// column show it blank.
fn plan_table(plan: &[Map<String, Value>]) -> (String, Vec<String>) {
    let columns: Vec<&String> = plan
        .first()
        .map(|row| row.keys().collect())
        .unwrap_or_default();
    let cells: Vec<Vec<String>> = plan
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(col.as_str()).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            cells
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
                .min(PLAN_COLUMN_MAX)
        })
        .collect();

    let format_row = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| {
                format!(
                    "{:<width$}",
                    truncate_string(value, *width),
                    width = *width
                )
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header = format_row(columns.iter().map(|c| c.as_str()).collect());
    let rows = cells
        .iter()
        .map(|row| format_row(row.iter().map(String::as_str).collect()))
        .collect();
    (header, rows)
}
