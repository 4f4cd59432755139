//! Query executor view for the MPM TUI.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{ExecutorOutput, ExecutorState};
use crate::ui::process_table::truncate_string;
use crate::ui::theme::label_style;

/// Widest a result column may get.
const RESULT_COLUMN_MAX: u16 = 32;

pub fn render_executor(frame: &mut Frame, area: Rect, executor: &ExecutorState) {
    let [input_area, output_area] =
        Layout::vertical([Constraint::Length(5), Constraint::Min(3)]).areas(area);

    render_input(frame, input_area, executor);
    render_output(frame, output_area, &executor.output);
}

fn render_input(frame: &mut Frame, area: Rect, executor: &ExecutorState) {
    let database = executor.database().unwrap_or("(default)");
    let lines = vec![
        Line::from(vec![
            Span::styled(" Database: ", label_style()),
            Span::styled(database.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("  ({} available)", executor.databases.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled(
                " > ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(executor.query.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
    ];

    let widget = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Query ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(widget, area);
}

fn render_output(frame: &mut Frame, area: Rect, output: &ExecutorOutput) {
    let block = Block::default().borders(Borders::ALL);
    let dim = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);

    match output {
        ExecutorOutput::Idle => {
            let text = Paragraph::new(Line::from(Span::styled(
                " Type a statement and press Enter",
                dim,
            )));
            frame.render_widget(text.block(block.title(" Result ")), area);
        }
        ExecutorOutput::Running => {
            let text = Paragraph::new(Line::from(Span::styled(" Running...", dim)));
            frame.render_widget(text.block(block.title(" Result ")), area);
        }
        ExecutorOutput::Message(message) => {
            let text = Paragraph::new(Line::from(Span::styled(
                format!(" {message}"),
                Style::default().fg(Color::Green),
            )))
            .wrap(Wrap { trim: false });
            frame.render_widget(text.block(block.title(" Result ")), area);
        }
        ExecutorOutput::Failed(error) => {
            let text = Paragraph::new(Line::from(Span::styled(
                format!(" {error}"),
                Style::default().fg(Color::Red),
            )))
            .wrap(Wrap { trim: false });
            let block = block
                .title(" Error ")
                .border_style(Style::default().fg(Color::Red));
            frame.render_widget(text.block(block), area);
        }
        ExecutorOutput::Rows { columns, rows } => {
            let plural = if rows.len() == 1 { "" } else { "s" };
            let title = format!(" Result ({} row{plural}) ", rows.len());
            let widths = column_widths(columns, rows);
            let header = Row::new(columns.iter().map(|c| Cell::from(c.clone()))).style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            );
            let body = rows.iter().map(|row| {
                Row::new(row.iter().map(|value| {
                    Cell::from(truncate_string(value, usize::from(RESULT_COLUMN_MAX)))
                }))
            });
            let table = Table::new(body, widths)
                .header(header)
                .column_spacing(2)
                .block(block.title(title));
            frame.render_widget(table, area);
        }
    }
}

fn column_widths(columns: &[String], rows: &[Vec<String>]) -> Vec<Constraint> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let widest = rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|value| value.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0);
            let width = u16::try_from(widest).unwrap_or(u16::MAX).min(RESULT_COLUMN_MAX);
            Constraint::Length(width)
        })
        .collect()
}
