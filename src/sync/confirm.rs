//! Completion detection for active checks.
//!
//! The backend runs a probe asynchronously and gives no completion signal.
//! The client polls instead: a first confirmatory fetch after a fixed delay,
//! then exponential backoff until the probe result shows up or the maximum
//! wait elapses.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::data::ServiceRecord;

/// Polling schedule for confirming an active check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmPolicy {
    /// Delay before the first confirmatory fetch.
    pub first_delay: Duration,
    /// Growth factor between successive waits.
    pub backoff_factor: f64,
    /// Total time after which the check is considered settled regardless.
    pub max_wait: Duration,
}

impl ConfirmPolicy {
    /// Default policy for a single-service check.
    pub fn single() -> Self {
        Self {
            first_delay: Duration::from_millis(2_500),
            backoff_factor: 2.0,
            max_wait: Duration::from_secs(20),
        }
    }

    /// Default policy for a check of all services.
    pub fn all() -> Self {
        Self {
            first_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_wait: Duration::from_secs(20),
        }
    }

    /// The successive waits between confirmatory fetches.
    ///
    /// Always yields at least the first delay, and never lets the cumulative
    /// wait exceed `max_wait` after that.
    pub fn waits(&self) -> Vec<Duration> {
        let factor = self.backoff_factor.max(1.0);
        let mut waits = vec![self.first_delay];
        let mut elapsed = self.first_delay;
        let mut next = grow(self.first_delay, factor);

        while elapsed < self.max_wait {
            let remaining = self.max_wait - elapsed;
            let wait = match next {
                Some(next) if next.is_zero() => break,
                Some(next) => next.min(remaining),
                // Growth left the representable range, so one last wait
                // covers what is left of max_wait
                None => remaining,
            };
            waits.push(wait);
            elapsed += wait;
            next = next.and_then(|n| grow(n, factor));
        }
        waits
    }
}

/// `wait * factor`, or `None` when it does not fit in a `Duration`.
fn grow(wait: Duration, factor: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(wait.as_secs_f64() * factor).ok()
}

/// `last_checked` values held before a check was triggered.
pub type Baseline = HashMap<String, Option<DateTime<Utc>>>;

/// Whether a record shows a probe newer than its baseline.
fn advanced(record: &ServiceRecord, before: Option<DateTime<Utc>>) -> bool {
    match (before, record.last_checked) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(before), Some(after)) => after > before,
    }
}

/// A single-service check has landed once its record was probed again.
pub fn single_completed(record: &ServiceRecord, baseline: &Baseline) -> bool {
    advanced(record, baseline.get(&record.id).copied().flatten())
}

/// A check of all services has landed once every active record advanced.
pub fn all_completed(records: &[ServiceRecord], baseline: &Baseline) -> bool {
    records
        .iter()
        .filter(|r| r.active)
        .all(|r| advanced(r, baseline.get(&r.id).copied().flatten()))
}
