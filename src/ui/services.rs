//! Service table rendering.
//!
//! Displays every visible service with status, address, HTTP code, latency,
//! an inline latency trend and the time since the last probe.

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::duration::time_ago;
use crate::data::{classify, ServiceRecord};
use crate::keymap::Action;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Samples shown in the inline trend column.
const TREND_WIDTH: usize = 10;

/// Render the service table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let services = app.visible();
    let block = Block::default()
        .title(title(app, services.len()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if services.is_empty() {
        let message = if app.registry.is_empty() {
            if app.loading {
                "Loading services...".to_string()
            } else {
                format!("No services yet. Press {} to add one.", app.keymap.hint(Action::Add))
            }
        } else {
            "No services match the current filter.".to_string()
        };
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(message, Style::default().add_modifier(Modifier::DIM))),
        ])
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Status"),
        Cell::from("Service"),
        Cell::from("Address"),
        Cell::from("HTTP"),
        Cell::from("Latency"),
        Cell::from("Trend"),
        Cell::from("Checked"),
    ])
    .height(1)
    .style(app.theme.header);

    let now = Utc::now();
    let compact = app.filter.compact;
    let rows: Vec<Row> = services
        .iter()
        .map(|s| {
            let tier = classify(s.last_latency_ms, &app.thresholds);

            let status = if app.is_checking(&s.id) {
                Cell::from("⟳ CHECK").style(Style::default().fg(app.theme.warning))
            } else {
                Cell::from(format!("● {}", s.last_status.label()))
                    .style(app.theme.status_style(s.last_status))
            };

            let checked = s
                .last_checked
                .map(|at| time_ago(at, now))
                .unwrap_or_else(|| "never".to_string());

            Row::new(vec![
                status,
                Cell::from(name_text(app, s, compact)),
                Cell::from(s.address()),
                Cell::from(s.http_label()),
                Cell::from(s.latency_label()).style(app.theme.latency_style(tier)),
                Cell::from(render_sparkline(&app.history.sparkline(&s.id, 8))),
                Cell::from(checked).style(Style::default().add_modifier(Modifier::DIM)),
            ])
            .height(if compact { 1 } else { 2 })
        })
        .collect();

    let widths = [
        Constraint::Length(9),                 // Status
        Constraint::Fill(3),                   // Service
        Constraint::Fill(2),                   // Address
        Constraint::Length(5),                 // HTTP
        Constraint::Length(8),                 // Latency
        Constraint::Length(TREND_WIDTH as u16), // Trend
        Constraint::Length(10),                // Checked
    ];

    let selected = app.selected_index.min(services.len().saturating_sub(1));

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

fn title(app: &App, shown: usize) -> String {
    let search_info = if app.search_active {
        format!(" /{}_", app.filter.search)
    } else if !app.filter.search.is_empty() {
        format!(" /{}/ [Esc:clear]", app.filter.search)
    } else {
        String::new()
    };

    let position_info = if shown > 0 {
        format!(" [{}/{}]", app.selected_index.min(shown - 1) + 1, shown)
    } else {
        String::new()
    };

    format!(
        " Services ({}/{}) {}{}{} ",
        shown,
        app.registry.len(),
        app.filter.mode.label(),
        search_info,
        position_info
    )
}

/// Name with env badge, plus the probe URL or last error on a second line.
fn name_text(app: &App, service: &ServiceRecord, compact: bool) -> Text<'static> {
    let mut spans = vec![Span::styled(
        service.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(badge) = service.env_badge() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {} ", badge), app.theme.badge));
    }
    if !service.active {
        spans.push(Span::styled(" paused", Style::default().add_modifier(Modifier::DIM)));
    }

    let mut lines = vec![Line::from(spans)];
    if !compact {
        let detail = match &service.last_error {
            Some(err) => Span::styled(err.clone(), Style::default().fg(app.theme.critical)),
            None => Span::styled(service.url(), Style::default().add_modifier(Modifier::DIM)),
        };
        lines.push(Line::from(detail));
    }
    Text::from(lines)
}

fn render_sparkline(data: &[u8]) -> String {
    if data.is_empty() {
        return " ".repeat(TREND_WIDTH);
    }

    // Take the most recent samples
    let skip = data.len().saturating_sub(TREND_WIDTH);
    data[skip..]
        .iter()
        .map(|&v| SPARKLINE_CHARS[v.min(7) as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparkline_keeps_latest_samples() {
        let data: Vec<u8> = (0..12).map(|i| (i % 8) as u8).collect();
        let line = render_sparkline(&data);
        assert_eq!(line.chars().count(), TREND_WIDTH);
        assert!(line.starts_with('▃'));
    }

    #[test]
    fn test_empty_sparkline_is_blank() {
        assert_eq!(render_sparkline(&[]), " ".repeat(TREND_WIDTH));
    }
}
