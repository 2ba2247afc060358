//! Common UI components shared across views.
//!
//! This module contains the header bar, filter tabs, status bar, and the
//! help, confirmation and notice overlays.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::App;
use crate::data::{FilterMode, ServiceStatus};
use crate::keymap::Action;

use super::centered_rect;

/// Render the header bar with aggregate stats.
///
/// Displays: overall indicator, total/up/down counts, average latency.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    if app.registry.is_empty() && app.last_updated.is_none() {
        let line = Line::from(vec![
            Span::styled(" SVCWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Loading..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let stats = app.stats();

    let status_style = if stats.down > 0 {
        app.theme.status_style(ServiceStatus::Down)
    } else if stats.up > 0 {
        app.theme.status_style(ServiceStatus::Up)
    } else {
        app.theme.status_style(ServiceStatus::Unknown)
    };

    let line = Line::from(vec![
        Span::styled(" ● ", status_style),
        Span::styled("SVCWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            format!("{}", stats.total),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" total │ "),
        Span::styled(format!("{}", stats.up), Style::default().fg(app.theme.healthy)),
        Span::raw(" up "),
        if stats.down > 0 {
            Span::styled(
                format!("{}", stats.down),
                Style::default().fg(app.theme.critical).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        },
        Span::raw(" down │ avg "),
        Span::raw(format!("{}ms", stats.avg_latency_ms)),
        if app.checking_all {
            Span::styled(" │ checking…", Style::default().fg(app.theme.warning))
        } else {
            Span::raw("")
        },
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the filter tabs, highlighting the active mode.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = FilterMode::ALL
        .iter()
        .map(|mode| {
            let key = app.keymap.hint(filter_action(*mode));
            Line::from(format!(" {}:{} ", key, mode.label()))
        })
        .collect();

    let selected = FilterMode::ALL
        .iter()
        .position(|m| *m == app.filter.mode)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

fn filter_action(mode: FilterMode) -> Action {
    match mode {
        FilterMode::All => Action::FilterAll,
        FilterMode::Up => Action::FilterUp,
        FilterMode::Down => Action::FilterDown,
        FilterMode::Unknown => Action::FilterUnknown,
        FilterMode::Slow => Action::FilterSlow,
        FilterMode::Changed => Action::FilterChanged,
    }
}

/// Render the status bar at the bottom.
///
/// Shows: backend, time since last update, available controls.
/// Also displays temporary status messages and load errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(ref err) = app.load_error {
        let paragraph = Paragraph::new(format!(
            " Refresh failed: {} | showing last good data | {}:retry",
            err,
            app.keymap.hint(Action::Refresh)
        ))
        .style(Style::default().fg(app.theme.warning));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.search_active {
        "Type to search | Enter:apply Esc:clear".to_string()
    } else {
        format!(
            "{}:search {}:refresh {}:check {}:add Enter:detail {}:help {}:quit",
            app.keymap.hint(Action::Search),
            app.keymap.hint(Action::Refresh),
            app.keymap.hint(Action::CheckSelected),
            app.keymap.hint(Action::Add),
            app.keymap.hint(Action::Help),
            app.keymap.hint(Action::Quit),
        )
    };

    let status = match app.last_updated {
        Some(at) => format!(
            " {} | Updated {:.0}s ago | {}",
            app.source_description(),
            at.elapsed().as_secs_f64(),
            controls
        ),
        None if app.loading => format!(" {} | Loading... | {}", app.source_description(), controls),
        None => format!(" {} | {}", app.source_description(), controls),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay, generated from the active keymap.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(" Navigation", bold)]),
        Line::from("  ↑/↓ j/k       Navigate list"),
        Line::from("  ←/→ Tab       Switch filter"),
        Line::from("  PgUp/PgDn     Jump 10 items"),
        Line::from("  Home/End      Jump to first/last"),
        Line::from("  Enter         Service detail"),
        Line::from("  Esc           Close / clear search"),
        Line::from(""),
        Line::from(vec![Span::styled(" Commands", bold)]),
    ];
    help_text.extend(
        app.keymap
            .help_entries()
            .into_iter()
            .map(|(keys, description)| Line::from(format!("  {:<13} {}", keys, description))),
    );
    help_text.push(Line::from(""));
    help_text.push(Line::from(vec![Span::styled(
        "Press any key to close",
        Style::default().add_modifier(Modifier::DIM),
    )]));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let height = help_text.len() as u16 + 2;
    let help_area = centered_rect(area, 46, height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}

/// Render the y/n prompt before deleting a service.
pub fn render_confirm(frame: &mut Frame, app: &App, id: &str, area: Rect) {
    let name = app
        .registry
        .get(id)
        .map(|s| s.name.as_str())
        .unwrap_or(id);

    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(" Delete service "),
            Span::styled(name.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("?"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " y:delete  n/Esc:cancel",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.critical));

    let confirm_area = centered_rect(area, 44, 6);
    frame.render_widget(Clear, confirm_area);
    frame.render_widget(Paragraph::new(text).block(block), confirm_area);
}

/// Render the blocking notice (failed mutations).
pub fn render_notice(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref notice) = app.notice else {
        return;
    };

    let text = vec![
        Line::from(""),
        Line::from(format!(" {}", notice.message)),
        Line::from(""),
        Line::from(Span::styled(
            " Enter:dismiss",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Right),
    ];

    let block = Block::default()
        .title(format!(" {} ", notice.title))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.critical));

    let notice_area = centered_rect(area, 60, 8);
    frame.render_widget(Clear, notice_area);
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        notice_area,
    );
}
