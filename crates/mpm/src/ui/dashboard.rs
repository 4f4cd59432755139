//! Dashboard view for the MPM TUI.
//!
//! Summary cards, per-user and per-command distribution bars, and CPU and
//! memory trends over the resource history.

use mpm_core::{Aggregates, GroupCounts, Process, ResourceHistory};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::process_table::truncate_string;
use crate::ui::theme::label_style;

const TREND_BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn render_dashboard(frame: &mut Frame, area: Rect, app: &App) {
    let [cards, distribution, trends] = Layout::vertical([
        Constraint::Length(6),
        Constraint::Min(4),
        Constraint::Length(4),
    ])
    .areas(area);

    let [count_area, blocking_area, totals_area] = Layout::horizontal([
        Constraint::Percentage(20),
        Constraint::Percentage(55),
        Constraint::Percentage(25),
    ])
    .areas(cards);
    let aggregates = app.engine.aggregates();
    render_count_card(frame, count_area, aggregates);
    render_blocking_card(frame, blocking_area, app.engine.blocking());
    render_totals_card(frame, totals_area, aggregates);

    let [users_area, commands_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(distribution);
    render_group_bars(
        frame,
        users_area,
        " By User ",
        &aggregates.by_user,
        Color::Cyan,
    );
    render_group_bars(
        frame,
        commands_area,
        " By Command ",
        &aggregates.by_command,
        Color::Magenta,
    );

    render_trends(frame, trends, app.engine.history());
}

fn render_count_card(frame: &mut Frame, area: Rect, aggregates: &Aggregates) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", aggregates.process_count),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("  sessions", label_style())),
    ];
    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Active "),
    );
    frame.render_widget(card, area);
}

fn render_blocking_card(frame: &mut Frame, area: Rect, blocking: Option<&Process>) {
    let (lines, border) = match blocking {
        Some(process) => {
            let value = Style::default().fg(Color::White);
            (
                vec![
                    Line::from(vec![
                        Span::styled("  Id: ", label_style()),
                        Span::styled(
                            process.id.to_string(),
                            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                        ),
                        Span::styled("  User: ", label_style()),
                        Span::styled(process.user.clone(), value),
                        Span::styled("  Time: ", label_style()),
                        Span::styled(process.time.to_string(), value),
                    ]),
                    Line::from(vec![
                        Span::styled("  State: ", label_style()),
                        Span::styled(
                            process.state.clone().unwrap_or_default(),
                            Style::default().fg(Color::Yellow),
                        ),
                    ]),
                    Line::from(vec![
                        Span::styled("  Info: ", label_style()),
                        Span::styled(
                            truncate_string(process.query_text().unwrap_or("NULL"), 60),
                            value,
                        ),
                    ]),
                ],
                Color::Red,
            )
        }
        None => (
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  No waiting sessions",
                    Style::default().fg(Color::Green),
                )),
            ],
            Color::DarkGray,
        ),
    };

    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Blocking ")
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(card, area);
}

fn render_totals_card(frame: &mut Frame, area: Rect, aggregates: &Aggregates) {
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  CPU:    ", label_style()),
            Span::raw(format!("{:.1}", aggregates.total_cpu)),
        ]),
        Line::from(vec![
            Span::styled("  Memory: ", label_style()),
            Span::raw(format!("{:.1}", aggregates.total_memory)),
        ]),
    ];
    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Totals "),
    );
    frame.render_widget(card, area);
}

fn render_group_bars(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    counts: &GroupCounts,
    color: Color,
) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let label_width = counts
        .entries()
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        .min(16);
    let max_count = counts.entries().iter().map(|(_, n)| *n).max().unwrap_or(0);
    // label, space, bar, space, count
    let bar_width = inner_width
        .saturating_sub(label_width.saturating_add(8))
        .max(1);

    let lines: Vec<Line> = counts
        .entries()
        .iter()
        .map(|(label, count)| {
            let label = if label.is_empty() { "(none)" } else { label.as_str() };
            Line::from(vec![
                Span::styled(
                    format!(
                        " {:<width$} ",
                        truncate_string(label, label_width),
                        width = label_width
                    ),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    build_bar(*count, max_count, bar_width),
                    Style::default().fg(color),
                ),
                Span::styled(format!(" {count}"), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string()),
    );
    frame.render_widget(widget, area);
}

fn render_trends(frame: &mut Frame, area: Rect, history: &ResourceHistory) {
    let width = usize::from(area.width.saturating_sub(14));
    let cpu = history.cpu_series();
    let memory = history.memory_series();

    let lines = vec![
        trend_row("  CPU    ", &cpu, width, Color::Green),
        trend_row("  Memory ", &memory, width, Color::Blue),
    ];
    let title = format!(
        " History (last {} of {}) ",
        history.len(),
        history.capacity()
    );
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title),
    );
    frame.render_widget(widget, area);
}

fn trend_row(label: &'static str, values: &[f64], width: usize, color: Color) -> Line<'static> {
    let latest = values.last().map(|v| format!(" {v:.1}")).unwrap_or_default();
    Line::from(vec![
        Span::styled(label, label_style()),
        Span::styled(trend_line(values, width), Style::default().fg(color)),
        Span::raw(latest),
    ])
}

/// Horizontal bar proportional to `count / max`, at least one cell when non-zero.
fn build_bar(count: usize, max: usize, width: usize) -> String {
    if max == 0 || count == 0 || width == 0 {
        return String::new();
    }
    let filled = (count as f64 / max as f64 * width as f64).round() as usize;
    "█".repeat(filled.clamp(1, width))
}

/// Renders values as block characters scaled between their min and max.
///
/// Keeps the most recent `width` values; a flat series sits mid-height.
fn trend_line(values: &[f64], width: usize) -> String {
    let start = values.len().saturating_sub(width);
    let window = values.get(start..).unwrap_or(&[]);
    let finite = window.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    window
        .iter()
        .map(|value| {
            let normalized = if !value.is_finite() {
                0.0
            } else if range > 0.0 {
                ((value - min) / range).clamp(0.0, 1.0)
            } else {
                0.5
            };
            let idx = ((normalized * 7.0) as usize).min(7);
            TREND_BLOCKS.get(idx).copied().unwrap_or(' ')
        })
        .collect()
}
