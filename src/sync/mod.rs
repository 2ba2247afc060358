//! Synchronization between the backend and the client-side registry.
//!
//! Network calls run as tokio tasks. They never touch the registry directly;
//! instead each one reports an [`Update`] over a channel, and the owner of
//! the registry (the [`App`](crate::App)) applies updates one at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  spawn   ┌──────────────┐   HTTP   ┌─────────┐
//! │ RefreshScheduler │────────▶│    Mirror    │────────▶│ Backend │
//! │  (interval tick) │          │ (tokio tasks)│◀────────│         │
//! └──────────────────┘          └──────┬───────┘          └─────────┘
//!                                      │ Update (mpsc)
//!                                      ▼
//!                               ┌──────────────┐
//!                               │  App::apply  │──▶ Registry
//!                               └──────────────┘
//! ```
//!
//! Every task captures the session epoch when it is spawned. Logging out
//! bumps the epoch, so results that resolve after teardown are recognised
//! and dropped instead of being applied to a fresh session.

pub mod confirm;
mod scheduler;

pub use confirm::{Baseline, ConfirmPolicy};
pub use scheduler::RefreshScheduler;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{Backend, CheckTarget};
use crate::data::{ServiceDraft, ServiceRecord};
use crate::error::Result;

/// A mutating request whose outcome the user should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Save(String),
    Delete(String),
    Check(CheckTarget),
    Logout,
}

impl Mutation {
    /// Short description for notices.
    pub fn describe(&self) -> String {
        match self {
            Mutation::Save(id) => format!("Save {}", id),
            Mutation::Delete(id) => format!("Delete {}", id),
            Mutation::Check(target) => format!("Check {}", target),
            Mutation::Logout => "Logout".to_string(),
        }
    }
}

/// Result of a background operation, to be applied by the registry owner.
#[derive(Debug)]
pub enum Update {
    /// Full service list fetched (or failed).
    Services {
        epoch: u64,
        result: Result<Vec<ServiceRecord>>,
    },
    /// Single service fetched (or failed).
    Service {
        epoch: u64,
        id: String,
        result: Result<ServiceRecord>,
    },
    /// Latency history for sparklines.
    History {
        epoch: u64,
        id: String,
        samples: Vec<f64>,
    },
    /// A mutating call finished.
    Mutation {
        epoch: u64,
        action: Mutation,
        result: Result<()>,
    },
    /// An active check stopped waiting for its probe.
    CheckSettled {
        epoch: u64,
        target: CheckTarget,
        completed: bool,
    },
    /// Login attempt finished.
    Login { epoch: u64, result: Result<()> },
}

impl Update {
    /// Session epoch the originating task was spawned in.
    pub fn epoch(&self) -> u64 {
        match self {
            Update::Services { epoch, .. }
            | Update::Service { epoch, .. }
            | Update::History { epoch, .. }
            | Update::Mutation { epoch, .. }
            | Update::CheckSettled { epoch, .. }
            | Update::Login { epoch, .. } => *epoch,
        }
    }
}

/// Receiving end of the update channel.
pub type UpdateReceiver = mpsc::UnboundedReceiver<Update>;

/// Registry operations against the backend.
///
/// Each operation spawns a task on the current tokio runtime and returns
/// immediately; the outcome arrives later as an [`Update`].
#[derive(Debug, Clone)]
pub struct Mirror {
    backend: Arc<dyn Backend>,
    updates: mpsc::UnboundedSender<Update>,
    epoch: Arc<AtomicU64>,
}

impl Mirror {
    /// Create a mirror over the given backend, returning the update receiver.
    pub fn new(backend: Arc<dyn Backend>) -> (Self, UpdateReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mirror = Self {
            backend,
            updates: tx,
            epoch: Arc::new(AtomicU64::new(0)),
        };
        (mirror, rx)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Current session epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Whether results from `epoch` still belong to the live session.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    /// Invalidate every in-flight task. Returns the new epoch.
    pub fn teardown(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn emit(&self, update: Update) {
        // Receiver gone means the app is shutting down
        let _ = self.updates.send(update);
    }

    fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(task)
    }

    /// Fetch the full service list.
    pub fn load_all(&self) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        self.spawn(async move {
            this.fetch_all(epoch).await;
        })
    }

    /// Fetch the full list inline, report it, and hand back the records.
    pub async fn fetch_all(&self, epoch: u64) -> Option<Vec<ServiceRecord>> {
        let result = self.backend.list_services().await;
        let records = match &result {
            Ok(records) => {
                debug!("Fetched {} services", records.len());
                Some(records.clone())
            }
            Err(e) => {
                warn!("Load failed, keeping last good state: {}", e);
                None
            }
        };
        self.emit(Update::Services { epoch, result });
        records
    }

    /// Fetch a single service.
    pub fn load_one(&self, id: &str) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        let id = id.to_string();
        self.spawn(async move {
            this.fetch_one(epoch, &id).await;
        })
    }

    async fn fetch_one(&self, epoch: u64, id: &str) -> Option<ServiceRecord> {
        let result = self.backend.get_service(id).await;
        let record = match &result {
            Ok(record) => Some(record.clone()),
            Err(e) => {
                warn!("Failed to load service {}: {}", id, e);
                None
            }
        };
        self.emit(Update::Service {
            epoch,
            id: id.to_string(),
            result,
        });
        record
    }

    /// Create or update a service. The registry is not touched optimistically.
    pub fn upsert(&self, draft: ServiceDraft) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        self.spawn(async move {
            let result = this.backend.upsert_service(&draft).await;
            match &result {
                Ok(()) => info!("Saved service {}", draft.id),
                Err(e) => warn!("Failed to save service {}: {}", draft.id, e),
            }
            this.emit(Update::Mutation {
                epoch,
                action: Mutation::Save(draft.id),
                result,
            });
        })
    }

    /// Delete a service. Callers confirm with the user first.
    pub fn remove(&self, id: &str) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        let id = id.to_string();
        self.spawn(async move {
            let result = this.backend.delete_service(&id).await;
            match &result {
                Ok(()) => info!("Deleted service {}", id),
                Err(e) => warn!("Failed to delete service {}: {}", id, e),
            }
            this.emit(Update::Mutation {
                epoch,
                action: Mutation::Delete(id),
                result,
            });
        })
    }

    /// Ask the backend to probe, then poll until the result shows up.
    ///
    /// Every confirmatory fetch is reported as a regular update. The task
    /// ends with [`Update::CheckSettled`] once the probe landed or the
    /// policy's maximum wait ran out.
    pub fn trigger_check(
        &self,
        target: CheckTarget,
        baseline: Baseline,
        policy: ConfirmPolicy,
    ) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        self.spawn(async move {
            if let Err(e) = this.backend.trigger_check(&target).await {
                warn!("Check request for {} failed: {}", target, e);
                this.emit(Update::Mutation {
                    epoch,
                    action: Mutation::Check(target.clone()),
                    result: Err(e),
                });
                this.emit(Update::CheckSettled {
                    epoch,
                    target,
                    completed: false,
                });
                return;
            }

            debug!("Check started for {}", target);
            let mut completed = false;
            for wait in policy.waits() {
                tokio::time::sleep(wait).await;
                if !this.is_current(epoch) {
                    return;
                }
                completed = match &target {
                    CheckTarget::One(id) => this
                        .fetch_one(epoch, id)
                        .await
                        .is_some_and(|r| confirm::single_completed(&r, &baseline)),
                    CheckTarget::All => this
                        .fetch_all(epoch)
                        .await
                        .is_some_and(|rs| confirm::all_completed(&rs, &baseline)),
                };
                if completed {
                    break;
                }
            }

            if completed {
                debug!("Check for {} landed", target);
            } else {
                info!("Check for {} not observed within {:?}", target, policy.max_wait);
            }
            this.emit(Update::CheckSettled {
                epoch,
                target,
                completed,
            });
        })
    }

    /// Fetch latency history for one service's sparkline.
    pub fn fetch_history(&self, id: &str) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        let id = id.to_string();
        self.spawn(async move {
            match this.backend.history(&id).await {
                Ok(samples) => this.emit(Update::History { epoch, id, samples }),
                Err(e) => debug!("History for {} unavailable: {}", id, e),
            }
        })
    }

    /// Exchange a password for a backend session.
    pub fn login(&self, password: String) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        self.spawn(async move {
            let result = this.backend.login(&password).await;
            if let Err(e) = &result {
                warn!("Login failed: {}", e);
            }
            this.emit(Update::Login { epoch, result });
        })
    }

    /// End the backend session. The caller tears down local state first.
    pub fn logout(&self) -> JoinHandle<()> {
        let this = self.clone();
        let epoch = self.epoch();
        self.spawn(async move {
            let result = this.backend.logout().await;
            if let Err(e) = &result {
                warn!("Logout request failed: {}", e);
            }
            this.emit(Update::Mutation {
                epoch,
                action: Mutation::Logout,
                result,
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use crate::error::ClientError;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn drain(rx: &mut UpdateReceiver) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    fn checked(id: &str, second: u32) -> ServiceRecord {
        let mut record = ServiceRecord::new(id, id, "h");
        record.last_checked = Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, second).unwrap());
        record
    }

    #[tokio::test]
    async fn test_load_all_reports_services() {
        let fake = Arc::new(FakeBackend::with_services(vec![checked("a", 0)]));
        let (mirror, mut rx) = Mirror::new(fake.clone());

        mirror.load_all().await.unwrap();

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 1);
        match &updates[0] {
            Update::Services { epoch, result } => {
                assert_eq!(*epoch, 0);
                assert_eq!(result.as_ref().unwrap().len(), 1);
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_all_failure_is_reported_not_raised() {
        let fake = Arc::new(FakeBackend::with_services(vec![]));
        fake.fail_loads(Some(ClientError::Transport("refused".into())));
        let (mirror, mut rx) = Mirror::new(fake);

        mirror.load_all().await.unwrap();

        match drain(&mut rx).as_slice() {
            [Update::Services { result: Err(_), .. }] => {}
            other => panic!("unexpected updates: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_teardown_advances_epoch() {
        let fake = Arc::new(FakeBackend::with_services(vec![]));
        let (mirror, mut rx) = Mirror::new(fake);
        let before = mirror.epoch();

        let handle = mirror.load_all();
        let after = mirror.teardown();
        handle.await.unwrap();

        assert_eq!(after, before + 1);
        assert!(!mirror.is_current(before));
        let updates = drain(&mut rx);
        assert_eq!(updates[0].epoch(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_settles_when_probe_lands() {
        let fake = Arc::new(FakeBackend::with_services(vec![checked("a", 0)]));
        fake.complete_checks_at(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 30).unwrap());
        let (mirror, mut rx) = Mirror::new(fake.clone());

        let baseline: Baseline = [("a".to_string(), Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()))]
            .into_iter()
            .collect();
        mirror
            .trigger_check(CheckTarget::One("a".into()), baseline, ConfirmPolicy::single())
            .await
            .unwrap();

        assert_eq!(fake.call_count("check:a"), 1);
        assert_eq!(fake.call_count("get:a"), 1);
        let updates = drain(&mut rx);
        assert!(matches!(
            updates.last(),
            Some(Update::CheckSettled { completed: true, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_all_gives_up_after_max_wait() {
        let fake = Arc::new(FakeBackend::with_services(vec![checked("a", 0)]));
        let (mirror, mut rx) = Mirror::new(fake.clone());
        let policy = ConfirmPolicy::all();
        let polls = policy.waits().len();

        let baseline: Baseline = [("a".to_string(), Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()))]
            .into_iter()
            .collect();
        let started = tokio::time::Instant::now();
        mirror
            .trigger_check(CheckTarget::All, baseline, policy.clone())
            .await
            .unwrap();

        assert!(started.elapsed() >= policy.max_wait);
        assert_eq!(fake.call_count("list"), polls);
        let updates = drain(&mut rx);
        assert!(matches!(
            updates.last(),
            Some(Update::CheckSettled { completed: false, target: CheckTarget::All, .. })
        ));
    }

    #[tokio::test]
    async fn test_rejected_check_reports_mutation_failure() {
        let fake = Arc::new(FakeBackend::with_services(vec![checked("a", 0)]));
        fake.fail_mutations(Some(ClientError::Status {
            code: 503,
            message: "busy".into(),
        }));
        let (mirror, mut rx) = Mirror::new(fake.clone());

        mirror
            .trigger_check(CheckTarget::One("a".into()), Baseline::new(), ConfirmPolicy::single())
            .await
            .unwrap();

        let updates = drain(&mut rx);
        assert!(matches!(
            &updates[0],
            Update::Mutation { action: Mutation::Check(_), result: Err(_), .. }
        ));
        assert!(matches!(
            &updates[1],
            Update::CheckSettled { completed: false, .. }
        ));
        assert_eq!(fake.call_count("get:"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_stops_polling_after_teardown() {
        let fake = Arc::new(FakeBackend::with_services(vec![checked("a", 0)]));
        let (mirror, mut rx) = Mirror::new(fake.clone());

        let handle = mirror.trigger_check(
            CheckTarget::One("a".into()),
            Baseline::new(),
            ConfirmPolicy::single(),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        mirror.teardown();
        handle.await.unwrap();

        assert_eq!(fake.call_count("get:"), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_remove_report_mutations() {
        let fake = Arc::new(FakeBackend::with_services(vec![]));
        let (mirror, mut rx) = Mirror::new(fake.clone());

        mirror
            .upsert(ServiceRecord::new("web", "Web", "web.local").to_draft())
            .await
            .unwrap();
        mirror.remove("web").await.unwrap();

        let updates = drain(&mut rx);
        assert!(matches!(
            &updates[0],
            Update::Mutation { action: Mutation::Save(id), result: Ok(()), .. } if id == "web"
        ));
        assert!(matches!(
            &updates[1],
            Update::Mutation { action: Mutation::Delete(id), result: Ok(()), .. } if id == "web"
        ));
        assert_eq!(fake.calls(), vec!["upsert:web", "delete:web"]);
    }

    #[tokio::test]
    async fn test_history_and_login() {
        let fake = Arc::new(FakeBackend::default());
        fake.set_history("a", vec![1.0, 2.0]);
        let (mirror, mut rx) = Mirror::new(fake.clone());

        mirror.fetch_history("a").await.unwrap();
        mirror.login("letmein".into()).await.unwrap();
        mirror.login("nope".into()).await.unwrap();

        let updates = drain(&mut rx);
        assert!(matches!(&updates[0], Update::History { samples, .. } if samples == &vec![1.0, 2.0]));
        assert!(matches!(&updates[1], Update::Login { result: Ok(()), .. }));
        assert!(matches!(
            &updates[2],
            Update::Login { result: Err(ClientError::Unauthorized), .. }
        ));
    }
}
