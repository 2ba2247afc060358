//! Login screen shown while there is no session.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

use super::centered_rect;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let masked = "*".repeat(app.password.chars().count());

    let status = if app.login_pending {
        Line::from(Span::styled("Logging in...", Style::default().fg(app.theme.warning)))
    } else if let Some(ref err) = app.login_error {
        Line::from(Span::styled(err.clone(), Style::default().fg(app.theme.critical)))
    } else {
        Line::from("")
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            app.source_description().to_string(),
            dim,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Password: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("{}_", masked), app.theme.selected),
        ]),
        Line::from(""),
        status,
        Line::from(""),
        Line::from(Span::styled("Enter:login  Esc:quit", dim)),
    ];

    let block = Block::default()
        .title(" SVCWATCH Login ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let login_area = centered_rect(area, 50, lines.len() as u16 + 2);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(block),
        login_area,
    );
}
