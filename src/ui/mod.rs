//! Terminal UI rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`services`]: Main table of services with status, latency and trend
//! - [`detail`]: Modal overlay with one service's details and latency chart
//! - [`editor`]: Create/edit service form
//! - [`login`]: Password prompt shown without a session
//! - [`common`]: Shared components (header, tabs, status bar, help, notices)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Filter tabs (common::render_tabs)    │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Service table (services::render)     │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - editor::render_overlay
//!    - common::render_help / render_confirm / render_notice
//! ```

pub mod common;
pub mod detail;
pub mod editor;
pub mod login;
pub mod services;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Overlay, Screen};

/// Minimum terminal size for usable display
pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 12;

/// Row where the service table's header sits (after header bar and tabs).
pub const CONTENT_START_ROW: u16 = 3;

/// Draw one frame.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.warning));
        let y = (area.height / 2).saturating_sub(2);
        let centered = Rect::new(0, y, area.width, 5.min(area.height - y));
        frame.render_widget(paragraph, centered);
        return;
    }

    if app.screen == Screen::Login {
        login::render(frame, app, area);
        if app.notice.is_some() {
            common::render_notice(frame, app, area);
        }
        return;
    }

    let chunks = Layout::vertical([
        Constraint::Length(1), // Header bar
        Constraint::Length(1), // Filter tabs
        Constraint::Min(8),    // Service table
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    common::render_tabs(frame, app, chunks[1]);
    services::render(frame, app, chunks[2]);
    common::render_status_bar(frame, app, chunks[3]);

    match &app.overlay {
        Overlay::None => {}
        Overlay::Help => common::render_help(frame, app, area),
        Overlay::Detail => detail::render_overlay(frame, app, area),
        Overlay::Editor(form) => editor::render_overlay(frame, app, form, area),
        Overlay::ConfirmDelete(id) => common::render_confirm(frame, app, id, area),
    }

    if app.notice.is_some() {
        common::render_notice(frame, app, area);
    }
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::config::{Settings, ThemeChoice};
    use crate::data::{ServiceRecord, ServiceStatus};
    use crate::sync::Mirror;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app(authenticated: bool) -> App {
        let fake = if authenticated {
            FakeBackend::with_services(vec![])
        } else {
            FakeBackend::default()
        };
        let (mirror, rx) = Mirror::new(Arc::new(fake));
        let settings = Settings {
            theme: ThemeChoice::Dark,
            ..Settings::default()
        };
        let mut app = App::new(mirror, rx, &settings).unwrap();

        let mut web = ServiceRecord::new("web", "Web Frontend", "web.local");
        web.last_status = ServiceStatus::Up;
        web.last_latency_ms = Some(42.0);
        web.env = Some("prod".into());
        let mut db = ServiceRecord::new("db", "Database", "db.local");
        db.last_status = ServiceStatus::Down;
        db.port = Some(5432);
        db.last_error = Some("connection refused".into());
        app.registry.replace_all(vec![web, db]);
        app.history.record("web", vec![40.0, 55.0, 42.0]);
        app
    }

    fn render(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_dashboard_renders_services_and_stats() {
        let app = app(true);
        let screen = render(&app, 100, 30);

        assert!(screen.contains("Web Frontend"));
        assert!(screen.contains("Database"));
        assert!(screen.contains("db.local:5432"));
        assert!(screen.contains("42ms"));
        assert!(screen.contains("PROD"));
        assert!(screen.contains("2 total"));
    }

    #[tokio::test]
    async fn test_overlays_render() {
        let mut app = app(true);

        app.open_detail();
        let screen = render(&app, 100, 30);
        assert!(screen.contains("Service Detail"));

        app.toggle_help();
        let screen = render(&app, 100, 30);
        assert!(screen.contains("Keyboard Shortcuts"));

        app.open_new_service();
        let screen = render(&app, 100, 30);
        assert!(screen.contains("New Service"));

        app.request_delete();
        let screen = render(&app, 100, 30);
        assert!(screen.contains("Delete"));
    }

    #[tokio::test]
    async fn test_login_screen() {
        let app = app(false);
        let screen = render(&app, 80, 20);
        assert!(screen.contains("Password"));
    }

    #[tokio::test]
    async fn test_small_terminal_message() {
        let app = app(true);
        let screen = render(&app, 40, 10);
        assert!(screen.contains("Terminal too small"));
    }
}
