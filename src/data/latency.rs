//! Latency classification.
//!
//! Maps a latency sample to a severity tier using configurable thresholds.

use std::time::Duration;

/// Thresholds used by the classifier and the view projector.
///
/// These determine when a service's latency is considered slow or
/// critical, and how far back the "changed recently" filter looks.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Latency (ms) at or above which a sample is a warning.
    pub latency_warn_ms: f64,
    /// Latency (ms) at or above which a sample is critical.
    pub latency_critical_ms: f64,
    /// Trailing window for the "changed recently" filter.
    pub changed_window: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            latency_warn_ms: 250.0,
            latency_critical_ms: 800.0,
            changed_window: Duration::from_secs(10 * 60),
        }
    }
}

/// Severity tier of a latency sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LatencyTier {
    /// No sample recorded.
    None,
    Ok,
    Warn,
    Critical,
}

impl LatencyTier {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            LatencyTier::None => "-",
            LatencyTier::Ok => "OK",
            LatencyTier::Warn => "WARN",
            LatencyTier::Critical => "CRIT",
        }
    }
}

/// Classify a latency sample against the thresholds.
pub fn classify(latency_ms: Option<f64>, thresholds: &Thresholds) -> LatencyTier {
    match latency_ms {
        None => LatencyTier::None,
        Some(ms) if ms >= thresholds.latency_critical_ms => LatencyTier::Critical,
        Some(ms) if ms >= thresholds.latency_warn_ms => LatencyTier::Warn,
        Some(_) => LatencyTier::Ok,
    }
}
