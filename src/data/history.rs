//! Latency history for sparklines.
//!
//! The backend keeps the authoritative history window. The client caches
//! the last fetched samples per service purely for rendering.

use std::collections::HashMap;

/// Cached latency samples per service id, in chronological order.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    samples: HashMap<String, Vec<f64>>,
}

impl HistoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the samples held for a service with a fresh fetch.
    pub fn record(&mut self, id: &str, samples: Vec<f64>) {
        self.samples.insert(id.to_string(), samples);
    }

    /// Samples for a service; empty if none were fetched.
    pub fn get(&self, id: &str) -> &[f64] {
        self.samples.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop samples for services that are no longer known.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.samples.retain(|id, _| keep(id));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Inline sparkline levels for a service (see [`levels`]).
    pub fn sparkline(&self, id: &str, levels_count: u8) -> Vec<u8> {
        levels(self.get(id), levels_count)
    }
}

/// Min/max of the samples with a zero span widened to 1.
fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let span = if max - min == 0.0 { 1.0 } else { max - min };
    Some((min, span))
}

/// Map samples to a min-max-normalized polyline inside a `width` x `height` box.
///
/// Points are in screen orientation (y grows downward) with a one-unit inset
/// on every side. An empty sequence yields no points; a single sample is
/// placed at the left edge on the baseline.
pub fn polyline(values: &[f64], width: f64, height: f64) -> Vec<(f64, f64)> {
    let Some((min, span)) = bounds(values) else {
        return Vec::new();
    };
    let steps = values.len().saturating_sub(1).max(1) as f64;

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let x = (i as f64 / steps) * (width - 2.0) + 1.0;
            let y = height - ((v - min) / span) * (height - 2.0) - 1.0;
            (x, y)
        })
        .collect()
}

/// Normalize samples to `0..levels_count` bar heights for inline sparklines.
pub fn levels(values: &[f64], levels_count: u8) -> Vec<u8> {
    let Some((min, span)) = bounds(values) else {
        return Vec::new();
    };
    let top = levels_count.saturating_sub(1);

    values
        .iter()
        .map(|v| {
            let normalized = ((v - min) / span * top as f64).round() as u8;
            normalized.min(top)
        })
        .collect()
}
