//! Backend abstraction for the health-check HTTP API.
//!
//! The backend owns service definitions, runs the probes and keeps the
//! latency history. This module provides a trait-based seam over it so the
//! mirror and the TUI can be driven by the real HTTP API or by an in-memory
//! double in tests.

mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use http::{HttpBackend, SESSION_COOKIE};

use std::fmt::{self, Debug};

use async_trait::async_trait;

use crate::data::{ServiceDraft, ServiceRecord};
use crate::error::Result;

/// What an active check should probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckTarget {
    /// Every active service.
    All,
    /// A single service by id.
    One(String),
}

impl fmt::Display for CheckTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckTarget::All => f.write_str("all services"),
            CheckTarget::One(id) => write!(f, "service {}", id),
        }
    }
}

/// Trait for talking to the health-check backend.
///
/// Implementations must be cheap to share across tasks; every method may be
/// called concurrently.
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// `GET /api/services`
    async fn list_services(&self) -> Result<Vec<ServiceRecord>>;

    /// `GET /api/services/{id}`
    async fn get_service(&self, id: &str) -> Result<ServiceRecord>;

    /// `POST /api/services` (create or update, keyed by `draft.id`)
    async fn upsert_service(&self, draft: &ServiceDraft) -> Result<()>;

    /// `DELETE /api/services/{id}`
    async fn delete_service(&self, id: &str) -> Result<()>;

    /// `POST /api/check` or `POST /api/check/{id}`.
    ///
    /// Returns as soon as the backend accepted the request; the probe itself
    /// runs asynchronously on the backend.
    async fn trigger_check(&self, target: &CheckTarget) -> Result<()>;

    /// `GET /api/history/{id}` latency samples, oldest first.
    async fn history(&self, id: &str) -> Result<Vec<f64>>;

    /// Exchange a password for a backend-issued session.
    async fn login(&self, password: &str) -> Result<()>;

    /// End the backend session and forget local credentials.
    async fn logout(&self) -> Result<()>;

    /// Whether credentials are currently held.
    fn is_authenticated(&self) -> bool;

    /// Returns a human-readable description of the backend.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}
