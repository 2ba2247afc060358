//! Application state and interaction logic.
//!
//! [`App`] is the single owner of the client-side registry. Background tasks
//! report through the [`Mirror`]'s update channel; the event loop drains it
//! with [`App::drain_updates`] between frames, so every replace or patch is
//! applied as one step.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::CheckTarget;
use crate::config::Settings;
use crate::data::{
    project, FilterMode, HistoryStore, PatchOutcome, Registry, ServiceRecord, Stats, Thresholds,
    ViewFilter,
};
use crate::error::ClientError;
use crate::export::Snapshot;
use crate::form::ServiceForm;
use crate::keymap::Keymap;
use crate::sync::{ConfirmPolicy, Mirror, Mutation, RefreshScheduler, Update, UpdateReceiver};
use crate::ui::Theme;

/// How long transient status messages stay visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Password prompt; no session.
    Login,
    /// Service list.
    Dashboard,
}

/// Modal drawn over the dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Overlay {
    #[default]
    None,
    Help,
    /// Detail of the selected service.
    Detail,
    Editor(ServiceForm),
    /// Waiting for y/n before deleting the service with this id.
    ConfirmDelete(String),
}

/// Blocking message that must be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub screen: Screen,
    pub overlay: Overlay,
    pub notice: Option<Notice>,

    // Sync
    mirror: Mirror,
    updates: UpdateReceiver,
    scheduler: RefreshScheduler,
    single_policy: ConfirmPolicy,
    all_policy: ConfirmPolicy,

    // Mirrored state
    pub registry: Registry,
    pub history: HistoryStore,
    pub thresholds: Thresholds,
    pub loading: bool,
    pub load_error: Option<String>,
    pub last_updated: Option<Instant>,

    // Active checks in flight
    pub checking: HashSet<String>,
    pub checking_all: bool,

    // View state, reset every session
    pub filter: ViewFilter,
    pub search_active: bool,
    pub selected_index: usize,

    // Login screen
    pub password: String,
    pub login_pending: bool,
    pub login_error: Option<String>,

    // UI
    pub keymap: Keymap,
    pub theme: Theme,
    pub export_path: PathBuf,
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create the app. Nothing is fetched until [`App::start`].
    pub fn new(mirror: Mirror, updates: UpdateReceiver, settings: &Settings) -> Result<Self> {
        let keymap = Keymap::from_overrides(&settings.keys)?;
        let screen = if mirror.backend().is_authenticated() {
            Screen::Dashboard
        } else {
            Screen::Login
        };

        Ok(Self {
            running: true,
            screen,
            overlay: Overlay::None,
            notice: None,
            mirror,
            updates,
            scheduler: RefreshScheduler::new(settings.refresh_interval),
            single_policy: settings.single_check_policy(),
            all_policy: settings.all_check_policy(),
            registry: Registry::new(),
            history: HistoryStore::new(),
            thresholds: settings.thresholds(),
            loading: false,
            load_error: None,
            last_updated: None,
            checking: HashSet::new(),
            checking_all: false,
            filter: ViewFilter::default(),
            search_active: false,
            selected_index: 0,
            password: String::new(),
            login_pending: false,
            login_error: None,
            keymap,
            theme: Theme::from_choice(settings.theme),
            export_path: PathBuf::from("svcwatch_export.json"),
            status_message: None,
        })
    }

    /// Begin the session if credentials are already held.
    pub fn start(&mut self) {
        if self.screen == Screen::Dashboard {
            self.begin_session();
        }
    }

    /// Returns a description of the backend.
    pub fn source_description(&self) -> &str {
        self.mirror.backend().description()
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < STATUS_TTL {
                return Some(msg);
            }
        }
        None
    }

    fn show_notice(&mut self, title: &str, message: String) {
        self.notice = Some(Notice {
            title: title.to_string(),
            message,
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // ---------------------------------------------------------------------
    // Session lifecycle
    // ---------------------------------------------------------------------

    fn begin_session(&mut self) {
        info!("Session started against {}", self.source_description());
        self.screen = Screen::Dashboard;
        self.login_pending = false;
        self.login_error = None;
        self.password.clear();
        self.refresh();
        self.scheduler.start(&self.mirror);
    }

    /// Drop all session state and return to the login screen.
    ///
    /// In-flight tasks are not aborted; their results carry the old epoch
    /// and are discarded by [`App::apply`].
    fn teardown(&mut self) {
        self.mirror.teardown();
        self.scheduler.stop();
        self.registry.clear();
        self.history.clear();
        self.filter = ViewFilter::default();
        self.search_active = false;
        self.selected_index = 0;
        self.checking.clear();
        self.checking_all = false;
        self.overlay = Overlay::None;
        self.notice = None;
        self.loading = false;
        self.load_error = None;
        self.last_updated = None;
        self.password.clear();
        self.login_pending = false;
        self.screen = Screen::Login;
    }

    /// End the session on the backend and locally.
    pub fn logout(&mut self) {
        info!("Logging out");
        self.mirror.logout();
        self.teardown();
    }

    fn expire_session(&mut self) {
        warn!("Credentials rejected, returning to login");
        self.teardown();
        self.login_error = Some("Session expired, please log in again".to_string());
    }

    pub fn login_push(&mut self, c: char) {
        self.password.push(c);
        self.login_error = None;
    }

    pub fn login_pop(&mut self) {
        self.password.pop();
    }

    /// Submit the typed password.
    pub fn submit_login(&mut self) {
        if self.login_pending {
            return;
        }
        if self.password.is_empty() {
            self.login_error = Some("Password required".to_string());
            return;
        }
        self.login_pending = true;
        self.login_error = None;
        self.mirror.login(std::mem::take(&mut self.password));
    }

    // ---------------------------------------------------------------------
    // Applying background results
    // ---------------------------------------------------------------------

    /// Apply every update that has arrived. Returns how many were applied.
    pub fn drain_updates(&mut self) -> usize {
        let mut count = 0;
        while let Ok(update) = self.updates.try_recv() {
            self.apply(update);
            count += 1;
        }
        count
    }

    /// Apply one background result to the state.
    pub fn apply(&mut self, update: Update) {
        if !self.mirror.is_current(update.epoch()) {
            debug!("Discarding update from ended session");
            return;
        }

        match update {
            Update::Services { result, .. } => {
                self.loading = false;
                match result {
                    Ok(records) => {
                        self.registry.replace_all(records);
                        let registry = &self.registry;
                        self.history.retain(|id| registry.contains(id));
                        self.load_error = None;
                        self.last_updated = Some(Instant::now());
                        self.clamp_selection();
                        self.request_visible_history();
                    }
                    Err(e) => self.handle_load_error(e),
                }
            }
            Update::Service { id, result, .. } => match result {
                Ok(record) => match self.registry.patch(record) {
                    PatchOutcome::Applied => {
                        self.last_updated = Some(Instant::now());
                        self.mirror.fetch_history(&id);
                    }
                    PatchOutcome::Stale => debug!("Ignoring stale response for {}", id),
                    PatchOutcome::Unknown => debug!("Ignoring response for unlisted {}", id),
                },
                Err(ClientError::NotFound(_)) => debug!("Service {} no longer exists", id),
                Err(e) => self.handle_load_error(e),
            },
            Update::History { id, samples, .. } => {
                if self.registry.contains(&id) {
                    self.history.record(&id, samples);
                }
            }
            Update::Mutation { action, result, .. } => self.apply_mutation(action, result),
            Update::CheckSettled {
                target, completed, ..
            } => {
                match &target {
                    CheckTarget::All => self.checking_all = false,
                    CheckTarget::One(id) => {
                        self.checking.remove(id);
                    }
                }
                if !completed {
                    self.set_status_message(format!("No result yet for {}", target));
                }
            }
            Update::Login { result, .. } => match result {
                Ok(()) => self.begin_session(),
                Err(e) => {
                    self.login_pending = false;
                    self.login_error = Some(match e {
                        ClientError::Unauthorized => "Invalid password".to_string(),
                        other => other.to_string(),
                    });
                }
            },
        }
    }

    fn handle_load_error(&mut self, error: ClientError) {
        if matches!(error, ClientError::Unauthorized) {
            self.expire_session();
        } else {
            self.load_error = Some(error.to_string());
        }
    }

    fn apply_mutation(&mut self, action: Mutation, result: crate::error::Result<()>) {
        match result {
            Ok(()) => match action {
                Mutation::Save(id) => {
                    self.set_status_message(format!("Saved {}", id));
                    self.refresh();
                }
                Mutation::Delete(id) => {
                    self.set_status_message(format!("Deleted {}", id));
                    self.refresh();
                }
                Mutation::Check(_) | Mutation::Logout => {}
            },
            Err(ClientError::Unauthorized) if action != Mutation::Logout => self.expire_session(),
            Err(e) => {
                if action == Mutation::Logout {
                    return;
                }
                let title = if e.is_rejection() {
                    "Request rejected"
                } else {
                    "Request failed"
                };
                self.show_notice(title, format!("{} failed: {}", action.describe(), e));
            }
        }
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    /// Reload the full list now.
    pub fn refresh(&mut self) {
        self.loading = true;
        self.mirror.load_all();
    }

    /// Reload a single service.
    pub fn refresh_service(&mut self, id: &str) {
        self.mirror.load_one(id);
    }

    fn request_visible_history(&self) {
        for service in self.visible() {
            self.mirror.fetch_history(&service.id);
        }
    }

    /// Ask the backend to probe every active service.
    pub fn check_all(&mut self) {
        if self.checking_all {
            self.set_status_message("Check already running".to_string());
            return;
        }
        self.checking_all = true;
        self.set_status_message("Checking all services...".to_string());
        self.mirror.trigger_check(
            CheckTarget::All,
            self.registry.check_baseline(),
            self.all_policy.clone(),
        );
    }

    /// Ask the backend to probe the selected service.
    pub fn check_selected(&mut self) {
        let Some(id) = self.selected_service().map(|s| s.id.clone()) else {
            return;
        };
        if !self.checking.insert(id.clone()) {
            return;
        }
        self.mirror.trigger_check(
            CheckTarget::One(id),
            self.registry.check_baseline(),
            self.single_policy.clone(),
        );
    }

    /// Whether a check covering this service is in flight.
    pub fn is_checking(&self, id: &str) -> bool {
        self.checking_all || self.checking.contains(id)
    }

    pub fn open_new_service(&mut self) {
        self.overlay = Overlay::Editor(ServiceForm::create());
    }

    pub fn open_edit_selected(&mut self) {
        if let Some(form) = self.selected_service().map(ServiceForm::edit) {
            self.overlay = Overlay::Editor(form);
        }
    }

    /// Validate the open editor and send it. Invalid input keeps it open.
    pub fn submit_editor(&mut self) {
        let Overlay::Editor(form) = &mut self.overlay else {
            return;
        };
        match form.to_draft() {
            Ok(draft) => {
                self.set_status_message(format!("Saving {}...", draft.id));
                self.mirror.upsert(draft);
                self.overlay = Overlay::None;
            }
            Err(e) => form.error = Some(e.to_string()),
        }
    }

    /// Ask for confirmation before deleting the selected service.
    pub fn request_delete(&mut self) {
        if let Some(id) = self.selected_service().map(|s| s.id.clone()) {
            self.overlay = Overlay::ConfirmDelete(id);
        }
    }

    pub fn confirm_delete(&mut self) {
        if let Overlay::ConfirmDelete(id) = std::mem::take(&mut self.overlay) {
            self.mirror.remove(&id);
        }
    }

    pub fn open_detail(&mut self) {
        if let Some(id) = self.selected_service().map(|s| s.id.clone()) {
            self.mirror.fetch_history(&id);
            self.overlay = Overlay::Detail;
        }
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
    }

    pub fn toggle_help(&mut self) {
        self.overlay = match self.overlay {
            Overlay::Help => Overlay::None,
            _ => Overlay::Help,
        };
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter.mode = mode;
        self.selected_index = 0;
    }

    pub fn next_filter(&mut self) {
        self.set_filter_mode(self.filter.mode.next());
    }

    pub fn prev_filter(&mut self) {
        self.set_filter_mode(self.filter.mode.prev());
    }

    pub fn toggle_compact(&mut self) {
        self.filter.compact = !self.filter.compact;
    }

    /// Enter search input mode (starts capturing keystrokes).
    pub fn start_search(&mut self) {
        self.search_active = true;
    }

    /// Exit search input mode, keeping the term.
    pub fn finish_search(&mut self) {
        self.search_active = false;
    }

    pub fn clear_search(&mut self) {
        self.filter.search.clear();
        self.search_active = false;
        self.selected_index = 0;
    }

    pub fn search_push(&mut self, c: char) {
        self.filter.search.push(c);
        self.selected_index = 0;
    }

    pub fn search_pop(&mut self) {
        self.filter.search.pop();
        self.clamp_selection();
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write the current state to `path` as JSON.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        if self.registry.is_empty() {
            anyhow::bail!("No services to export");
        }
        Snapshot::build(
            &self.registry,
            &self.history,
            &self.thresholds,
            self.source_description(),
            Utc::now(),
        )
        .write_to(path)
    }

    // ---------------------------------------------------------------------
    // Projection and selection
    // ---------------------------------------------------------------------

    /// Services to display, in order.
    pub fn visible(&self) -> Vec<&ServiceRecord> {
        project(&self.registry, &self.filter, &self.thresholds, Utc::now())
    }

    pub fn stats(&self) -> Stats {
        Stats::from_registry(&self.registry)
    }

    pub fn selected_service(&self) -> Option<&ServiceRecord> {
        self.visible().get(self.selected_index).copied()
    }

    fn clamp_selection(&mut self) {
        let count = self.visible().len();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.visible().len().saturating_sub(1);
    }
}
