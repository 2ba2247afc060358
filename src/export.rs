//! JSON export of the current service state.
//!
//! Used by the in-app export shortcut and by `svcwatch --export <path>`,
//! which fetches once from the backend and exits without starting the TUI.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::client::Backend;
use crate::data::{classify, HistoryStore, Registry, ServiceRecord, Stats, Thresholds};

/// Aggregate section of an export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub unknown: usize,
    pub avg_latency_ms: u64,
}

impl From<Stats> for Summary {
    fn from(stats: Stats) -> Self {
        Self {
            total: stats.total,
            up: stats.up,
            down: stats.down,
            unknown: stats.total.saturating_sub(stats.up + stats.down),
            avg_latency_ms: stats.avg_latency_ms,
        }
    }
}

/// One service with its derived latency tier and cached history.
#[derive(Debug, Serialize)]
pub struct ServiceEntry<'a> {
    #[serde(flatten)]
    pub record: &'a ServiceRecord,
    pub latency_tier: &'static str,
    #[serde(skip_serializing_if = "no_samples")]
    pub history: &'a [f64],
}

fn no_samples(samples: &&[f64]) -> bool {
    samples.is_empty()
}

/// Everything written to an export file.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub exported_at: DateTime<Utc>,
    pub source: &'a str,
    pub summary: Summary,
    pub services: Vec<ServiceEntry<'a>>,
}

impl<'a> Snapshot<'a> {
    /// Build a snapshot of the whole registry, ordered by id.
    pub fn build(
        registry: &'a Registry,
        history: &'a HistoryStore,
        thresholds: &Thresholds,
        source: &'a str,
        now: DateTime<Utc>,
    ) -> Self {
        let services = registry
            .iter()
            .map(|record| ServiceEntry {
                record,
                latency_tier: classify(record.last_latency_ms, thresholds).symbol(),
                history: history.get(&record.id),
            })
            .collect();

        Self {
            exported_at: now,
            source,
            summary: Stats::from_registry(registry).into(),
            services,
        }
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        debug!("Wrote {} services to {}", self.services.len(), path.display());
        Ok(())
    }
}

/// Fetch the service list and histories once and write an export file.
///
/// Returns the number of services exported.
pub async fn fetch_and_export(
    backend: &dyn Backend,
    thresholds: &Thresholds,
    path: &Path,
) -> Result<usize> {
    let records = backend
        .list_services()
        .await
        .context("Failed to load services")?;

    let mut registry = Registry::new();
    registry.replace_all(records);

    let mut history = HistoryStore::new();
    for record in registry.iter() {
        match backend.history(&record.id).await {
            Ok(samples) => history.record(&record.id, samples),
            Err(e) => debug!("No history for {}: {}", record.id, e),
        }
    }

    let snapshot = Snapshot::build(
        &registry,
        &history,
        thresholds,
        backend.description(),
        Utc::now(),
    );
    snapshot.write_to(path)?;
    info!("Exported {} services to {}", registry.len(), path.display());
    Ok(registry.len())
}
