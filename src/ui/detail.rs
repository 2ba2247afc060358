//! Detail overlay rendering.
//!
//! Displays a modal overlay with everything known about the selected
//! service and a chart of its recent latency samples.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as Segment},
        Block, Borders, Clear, Paragraph,
    },
    Frame,
};

use crate::app::App;
use crate::data::duration::time_ago;
use crate::data::history::polyline;
use crate::data::{classify, LatencyTier, ServiceRecord};
use crate::keymap::Action;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 16;

/// Render the service detail as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    // Skip rendering if terminal is too small for the overlay
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(service) = app.selected_service() else {
        return;
    };

    // Width: 95% of screen, clamped to [MIN_OVERLAY_WIDTH, 100]
    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 100);
    // Height: 90% of screen, clamped to [MIN_OVERLAY_HEIGHT, 40]
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 40);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(10), // Service info
        Constraint::Min(5),     // Latency chart
        Constraint::Length(1),  // Footer
    ])
    .split(overlay_area);

    let info_block = Block::default()
        .title(" Service Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));
    frame.render_widget(
        Paragraph::new(info_lines(app, service)).block(info_block),
        chunks[0],
    );

    render_chart(frame, app, service, chunks[1]);

    let footer = Paragraph::new(Line::from(vec![Span::styled(
        format!(
            " Esc:close  ↑/↓:switch  {}:check  {}:edit ",
            app.keymap.hint(Action::CheckSelected),
            app.keymap.hint(Action::Edit)
        ),
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}

fn info_lines(app: &App, service: &ServiceRecord) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let now = Utc::now();
    let tier = classify(service.last_latency_ms, &app.thresholds);

    let mut title = vec![Span::styled(format!(" {} ", service.name), bold)];
    if let Some(badge) = service.env_badge() {
        title.push(Span::styled(format!(" {} ", badge), app.theme.badge));
    }
    if !service.active {
        title.push(Span::styled("  paused", dim));
    }
    if app.is_checking(&service.id) {
        title.push(Span::styled("  checking…", Style::default().fg(app.theme.warning)));
    }

    let status = if app.is_checking(&service.id) {
        Span::styled("⟳ checking", Style::default().fg(app.theme.warning))
    } else {
        Span::styled(
            format!("● {}", service.last_status.label()),
            app.theme.status_style(service.last_status).add_modifier(Modifier::BOLD),
        )
    };

    let ago = |ts: Option<chrono::DateTime<Utc>>| {
        ts.map(|t| time_ago(t, now)).unwrap_or_else(|| "never".to_string())
    };

    vec![
        Line::from(title),
        Line::from(vec![Span::raw(" ID: "), Span::styled(service.id.clone(), dim)]),
        Line::from(vec![
            Span::raw(" Status: "),
            status,
            Span::raw("    HTTP: "),
            Span::styled(service.http_label(), bold),
            Span::raw("    Latency: "),
            Span::styled(
                format!("{} {}", service.latency_label(), tier_label(tier)),
                app.theme.latency_style(tier),
            ),
        ]),
        Line::from(vec![
            Span::raw(" URL: "),
            Span::styled(service.url(), Style::default().fg(app.theme.highlight)),
        ]),
        Line::from(format!(
            " Protocol: {}    Address: {}    Path: {}",
            service.protocol,
            service.address(),
            if service.path.is_empty() { "/" } else { service.path.as_str() }
        )),
        Line::from(format!(
            " Changed: {}    Checked: {}",
            ago(service.last_change),
            ago(service.last_checked)
        )),
        match &service.last_error {
            Some(err) => Line::from(vec![
                Span::raw(" Error: "),
                Span::styled(err.clone(), Style::default().fg(app.theme.critical)),
            ]),
            None => Line::from(Span::styled(" No errors reported", dim)),
        },
    ]
}

fn tier_label(tier: LatencyTier) -> &'static str {
    match tier {
        LatencyTier::None => "",
        tier => tier.symbol(),
    }
}

/// Plot recent latency samples as a line chart.
fn render_chart(frame: &mut Frame, app: &App, service: &ServiceRecord, area: Rect) {
    let samples = app.history.get(&service.id);
    let block = Block::default()
        .title(format!(" Latency ({} samples) ", samples.len()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if samples.len() < 2 {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Not enough history to chart",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let (min, max) = samples
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    let width = 100.0;
    let height = 50.0;
    let points = polyline(samples, width, height);
    let color: Color = app.theme.highlight;

    let canvas = Canvas::default()
        .block(block.title_bottom(format!(" min {:.0}ms  max {:.0}ms ", min, max)))
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            // polyline is in screen orientation, the canvas grows upward
            for pair in points.windows(2) {
                let (x1, y1) = pair[0];
                let (x2, y2) = pair[1];
                ctx.draw(&Segment::new(x1, height - y1, x2, height - y2, color));
            }
        });

    frame.render_widget(canvas, area);
}
