//! View projection and aggregate statistics.
//!
//! Projection is a pure function of the registry, the ephemeral filter state
//! and the wall clock. It never mutates the registry and can be re-run freely.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::latency::Thresholds;
use super::registry::Registry;
use super::service::{ServiceRecord, ServiceStatus};

/// Which subset of services to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    All,
    Up,
    Down,
    Unknown,
    /// Latency at or above the warning threshold.
    Slow,
    /// Status changed within the trailing window.
    Changed,
}

impl FilterMode {
    /// All modes in tab order.
    pub const ALL: [FilterMode; 6] = [
        FilterMode::All,
        FilterMode::Up,
        FilterMode::Down,
        FilterMode::Unknown,
        FilterMode::Slow,
        FilterMode::Changed,
    ];

    /// Returns the display label for this mode.
    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Up => "Up",
            FilterMode::Down => "Down",
            FilterMode::Unknown => "Unknown",
            FilterMode::Slow => "Slow",
            FilterMode::Changed => "Changed",
        }
    }

    /// Cycle to the next mode.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Cycle to the previous mode.
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Ephemeral UI filter state. Not persisted; reset each session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub mode: FilterMode,
    pub search: String,
    pub compact: bool,
}

/// Project the registry into the ordered list of services to display.
///
/// Services are ordered by name, then filtered by search term, status,
/// slowness and recent change, in that order.
pub fn project<'a>(
    registry: &'a Registry,
    filter: &ViewFilter,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> Vec<&'a ServiceRecord> {
    let term = filter.search.to_lowercase();
    let mut services: Vec<&ServiceRecord> = registry.iter().collect();
    services.sort_by(|a, b| collate(a, b));

    services
        .into_iter()
        .filter(|s| matches_search(s, &term))
        .filter(|s| matches_mode(s, filter.mode, thresholds, now))
        .collect()
}

/// Name ordering: accent- and case-folded first, then exact name, then id
/// for a total order.
fn collate(a: &ServiceRecord, b: &ServiceRecord) -> Ordering {
    sort_key(&a.name)
        .cmp(&sort_key(&b.name))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// "Émail" sorts as "email".
fn sort_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn matches_search(service: &ServiceRecord, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    format!("{} {}", service.name, service.host)
        .to_lowercase()
        .contains(term)
}

fn matches_mode(
    service: &ServiceRecord,
    mode: FilterMode,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> bool {
    match mode {
        FilterMode::All => true,
        FilterMode::Up => service.last_status == ServiceStatus::Up,
        FilterMode::Down => service.last_status == ServiceStatus::Down,
        FilterMode::Unknown => service.last_status == ServiceStatus::Unknown,
        FilterMode::Slow => service
            .last_latency_ms
            .is_some_and(|ms| ms >= thresholds.latency_warn_ms),
        FilterMode::Changed => changed_recently(service, thresholds, now),
    }
}

/// Whether the service's status flipped within the trailing window.
pub fn changed_recently(service: &ServiceRecord, thresholds: &Thresholds, now: DateTime<Utc>) -> bool {
    let Some(changed_at) = service.last_change else {
        return false;
    };
    let Ok(window) = chrono::Duration::from_std(thresholds.changed_window) else {
        return true;
    };
    now - changed_at <= window
}

/// Aggregate counts over the whole registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    /// Mean of positive latencies, rounded; 0 when there are none.
    pub avg_latency_ms: u64,
}

impl Stats {
    /// Compute stats from the full registry (not the filtered view).
    pub fn from_registry(registry: &Registry) -> Self {
        let mut up = 0;
        let mut down = 0;
        let mut latency_sum = 0.0;
        let mut latency_count = 0usize;

        for service in registry.iter() {
            match service.last_status {
                ServiceStatus::Up => up += 1,
                ServiceStatus::Down => down += 1,
                ServiceStatus::Unknown => {}
            }
            if let Some(ms) = service.last_latency_ms.filter(|ms| *ms > 0.0) {
                latency_sum += ms;
                latency_count += 1;
            }
        }

        let avg_latency_ms = if latency_count > 0 {
            (latency_sum / latency_count as f64).round() as u64
        } else {
            0
        };

        Self {
            total: registry.len(),
            up,
            down,
            avg_latency_ms,
        }
    }
}
