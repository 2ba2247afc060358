//! Client-side mirror of the services known to the backend.
//!
//! The registry is replaced wholesale on a full fetch and patched one record
//! at a time after a targeted fetch. Each call is a single step: readers never
//! observe a half-applied update.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use super::service::ServiceRecord;

/// Outcome of patching a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The record replaced the held copy.
    Applied,
    /// The held copy was checked more recently; the response was discarded.
    Stale,
    /// No record with this id is held; nothing changed.
    Unknown,
}

/// In-memory mapping of service id to its last fetched record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    services: BTreeMap<String, ServiceRecord>,
    /// Bumped on every change; lets views detect that a re-projection is due.
    revision: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole registry with a freshly fetched list.
    ///
    /// Duplicate ids keep the last occurrence.
    pub fn replace_all(&mut self, records: Vec<ServiceRecord>) {
        let services = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        self.services = services;
        self.revision += 1;
    }

    /// Replace a single held record.
    ///
    /// Responses whose `last_checked` is strictly older than the held copy
    /// are discarded, so a slow targeted fetch cannot roll back a newer
    /// full refresh.
    pub fn patch(&mut self, record: ServiceRecord) -> PatchOutcome {
        let Some(held) = self.services.get_mut(&record.id) else {
            return PatchOutcome::Unknown;
        };

        if let (Some(held_at), Some(incoming_at)) = (held.last_checked, record.last_checked) {
            if incoming_at < held_at {
                return PatchOutcome::Stale;
            }
        }

        *held = record;
        self.revision += 1;
        PatchOutcome::Applied
    }

    /// Drop every record (logout/teardown).
    pub fn clear(&mut self) {
        self.services.clear();
        self.revision += 1;
    }

    pub fn get(&self, id: &str) -> Option<&ServiceRecord> {
        self.services.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Iterate over records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.services.values()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Snapshot of `last_checked` per id, used to detect when a check lands.
    pub fn check_baseline(&self) -> HashMap<String, Option<DateTime<Utc>>> {
        self.services
            .iter()
            .map(|(id, r)| (id.clone(), r.last_checked))
            .collect()
    }
}
