use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::app::{App, Overlay, Screen};
use crate::data::FilterMode;
use crate::keymap::Action;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    // A notice blocks everything until acknowledged
    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_notice();
        }
        return;
    }

    if app.screen == Screen::Login {
        handle_login_input(app, key);
        return;
    }

    match app.overlay {
        Overlay::None => {}
        Overlay::Help => {
            // Any key closes help
            app.close_overlay();
            return;
        }
        Overlay::Detail => {
            handle_detail_input(app, key);
            return;
        }
        Overlay::Editor(_) => {
            handle_editor_input(app, key);
            return;
        }
        Overlay::ConfirmDelete(_) => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_overlay(),
                _ => {}
            }
            return;
        }
    }

    if app.search_active {
        handle_search_input(app, key);
        return;
    }

    match key.code {
        // Navigation
        KeyCode::Up => app.select_prev(),
        KeyCode::Down => app.select_next(),
        KeyCode::Char('k') if key.modifiers.is_empty() => app.select_prev(),
        KeyCode::Char('j') if key.modifiers.is_empty() => app.select_next(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Filter tabs
        KeyCode::Left | KeyCode::BackTab => app.prev_filter(),
        KeyCode::Right | KeyCode::Tab => app.next_filter(),

        KeyCode::Enter => app.open_detail(),
        KeyCode::Esc => {
            if !app.filter.search.is_empty() {
                app.clear_search();
            }
        }

        _ => {
            if let Some(action) = app.keymap.action_for(&key) {
                perform(app, action);
            }
        }
    }
}

/// Run a keymap action on the dashboard.
pub fn perform(app: &mut App, action: Action) {
    match action {
        Action::Search => app.start_search(),
        Action::Refresh => {
            app.refresh();
            app.set_status_message("Refreshing...".to_string());
        }
        Action::CheckAll => app.check_all(),
        Action::CheckSelected => app.check_selected(),
        Action::Add => app.open_new_service(),
        Action::Edit => app.open_edit_selected(),
        Action::Delete => app.request_delete(),
        Action::FilterAll => app.set_filter_mode(FilterMode::All),
        Action::FilterUp => app.set_filter_mode(FilterMode::Up),
        Action::FilterDown => app.set_filter_mode(FilterMode::Down),
        Action::FilterUnknown => app.set_filter_mode(FilterMode::Unknown),
        Action::FilterSlow => app.set_filter_mode(FilterMode::Slow),
        Action::FilterChanged => app.set_filter_mode(FilterMode::Changed),
        Action::ToggleCompact => app.toggle_compact(),
        Action::Export => {
            let export_path = app.export_path.clone();
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }
        Action::Logout => app.logout(),
        Action::Help => app.toggle_help(),
        Action::Quit => app.quit(),
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_login(),
        KeyCode::Esc => app.quit(),
        KeyCode::Backspace => app.login_pop(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.login_push(c),
        _ => {}
    }
}

fn handle_detail_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
            app.close_overlay();
        }
        // Allow scrolling through services while the overlay is open
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        _ => {
            if let Some(action @ (Action::CheckSelected | Action::Edit)) = app.keymap.action_for(&key)
            {
                app.close_overlay();
                perform(app, action);
            }
        }
    }
}

fn handle_editor_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.submit_editor();
        return;
    }
    if key.code == KeyCode::Esc {
        app.close_overlay();
        return;
    }

    let Overlay::Editor(form) = &mut app.overlay else {
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Left | KeyCode::Right if form.focus.is_choice() => form.toggle(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => form.input(c),
        _ => {}
    }
}

/// Handle key input while search is active
fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        // Confirm search
        KeyCode::Enter => app.finish_search(),

        // Clear and exit
        KeyCode::Esc => app.clear_search(),

        KeyCode::Backspace => {
            app.search_pop();
            if app.filter.search.is_empty() {
                app.finish_search();
            }
        }

        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.search_push(c),

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    if app.screen != Screen::Dashboard || app.overlay != Overlay::None || app.notice.is_some() {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        // Click to select
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked_row = mouse.row;
            if clicked_row > content_start_row {
                let item_row = (clicked_row - content_start_row - 1) as usize;
                let rows_per_item = if app.filter.compact { 1 } else { 2 };
                let index = item_row / rows_per_item;
                if index < app.visible().len() {
                    app.selected_index = index;
                }
            }
        }

        // Right-click opens the detail
        MouseEventKind::Down(MouseButton::Right) => app.open_detail(),

        _ => {}
    }
}
