//! # svcwatch
//!
//! A terminal dashboard and library for watching services registered with
//! an HTTP health-check backend.
//!
//! The backend owns service definitions, runs the probes and keeps latency
//! history. svcwatch mirrors that state locally, refreshes it on a timer,
//! lets the operator trigger checks and edit services, and renders the
//! result in an interactive terminal UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │(registry)│    │(render) │    │         │ │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘ │
//! │       │ ▲ Update                                            │
//! │       ▼ │                                                   │
//! │  ┌─────────┐    ┌──────────┐                                │
//! │  │  sync   │───▶│  client  │◀── HttpBackend | test double   │
//! │  │(mirror) │    │(Backend) │                                │
//! │  └─────────┘    └──────────┘                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, the single owner of the service registry
//! - **[`client`]**: The [`Backend`] trait and its HTTP implementation
//! - **[`sync`]**: The [`Mirror`] that runs backend calls as tasks and reports
//!   back with [`Update`] messages, plus the refresh timer and check polling
//! - **[`data`]**: Service records, the registry, filtering, latency tiers and
//!   history
//! - **[`ui`]**: Terminal rendering using ratatui
//! - **[`config`]**, **[`keymap`]**, **[`logging`]**: Settings layers, key
//!   bindings and tracing setup
//! - **[`export`]**: JSON snapshots of the current state
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a local backend
//! svcwatch --url http://localhost:8080
//!
//! # Use a static token and refresh every 5 seconds
//! svcwatch --url https://health.internal --token secret --refresh 5s
//!
//! # Write a JSON snapshot and exit
//! svcwatch --export services.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use svcwatch::{App, HttpBackend, Mirror, Settings};
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::default();
//! let backend = HttpBackend::new(&settings.base_url, Duration::from_secs(10))
//!     .unwrap()
//!     .with_token("secret");
//! let (mirror, updates) = Mirror::new(Arc::new(backend));
//! let mut app = App::new(mirror, updates, &settings).unwrap();
//! app.start();
//!
//! // Later, from the render loop
//! app.drain_updates();
//! # });
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod export;
pub mod form;
pub mod keymap;
pub mod logging;
pub mod sync;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use client::{Backend, CheckTarget, HttpBackend};
pub use config::{Overrides, Settings, ThemeChoice};
pub use data::{
    FilterMode, HistoryStore, LatencyTier, Registry, ServiceDraft, ServiceRecord, ServiceStatus,
    Thresholds,
};
pub use error::ClientError;
pub use export::Snapshot;
pub use keymap::{Action, Keymap};
pub use sync::{ConfirmPolicy, Mirror, RefreshScheduler, Update};
