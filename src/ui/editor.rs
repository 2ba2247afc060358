//! Service editor overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::form::{Field, ServiceForm};

use super::centered_rect;

const LABEL_WIDTH: usize = 10;

/// Render the create/edit form as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, form: &ServiceForm, area: Rect) {
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut lines = vec![Line::from("")];
    for field in Field::ALL {
        let focused = form.focus == field;
        let locked = form.is_locked(field);

        let marker = if focused { "▶ " } else { "  " };
        let label = format!("{}{:<width$}", marker, field.label(), width = LABEL_WIDTH);
        let label_style = if focused {
            Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let mut value = form.value(field);
        if focused && !field.is_choice() {
            value.push('_');
        }
        let value_style = if locked {
            dim
        } else if focused {
            app.theme.selected
        } else {
            Style::default()
        };

        let mut spans = vec![
            Span::styled(label, label_style),
            Span::styled(value, value_style),
        ];
        if locked {
            spans.push(Span::styled("  (locked)", dim));
        } else if focused && field.is_choice() {
            spans.push(Span::styled("  Space/←/→:toggle", dim));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    match &form.error {
        Some(err) => lines.push(Line::from(Span::styled(
            format!("  {}", err),
            Style::default().fg(app.theme.critical),
        ))),
        None => lines.push(Line::from("")),
    }
    lines.push(Line::from(Span::styled(
        "  Tab/↓:next  Shift+Tab/↑:prev  Enter:save  Esc:cancel",
        dim,
    )));

    let block = Block::default()
        .title(format!(" {} ", form.title()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let height = lines.len() as u16 + 2;
    let editor_area = centered_rect(area, 64, height);
    frame.render_widget(Clear, editor_area);
    frame.render_widget(Paragraph::new(lines).block(block), editor_area);
}
