//! Passive refresh timer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use super::Mirror;

const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Reloads the full service list on a fixed interval.
///
/// At most one timer is active; starting again replaces the running one.
/// Ticks fire regardless of whether a previous load is still in flight.
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking. The first reload happens one interval from now.
    pub fn start(&mut self, mirror: &Mirror) {
        self.stop();
        let mirror = mirror.clone();
        let period = self.interval;
        debug!("Starting passive refresh every {:?}", period);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                mirror.load_all();
            }
        }));
    }

    /// Cancel the timer. Loads already spawned still report their results.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Stopping passive refresh");
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeBackend;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_reload_until_stopped() {
        let fake = Arc::new(FakeBackend::with_services(vec![]));
        let (mirror, _rx) = Mirror::new(fake.clone());
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(15));

        scheduler.start(&mirror);
        assert!(scheduler.is_running());

        time::sleep(Duration::from_secs(14)).await;
        assert_eq!(fake.call_count("list"), 0);

        time::sleep(Duration::from_secs(17)).await;
        assert_eq!(fake.call_count("list"), 2);

        scheduler.stop();
        assert!(!scheduler.is_running());
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fake.call_count("list"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_timer() {
        let fake = Arc::new(FakeBackend::with_services(vec![]));
        let (mirror, _rx) = Mirror::new(fake.clone());
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(10));

        scheduler.start(&mirror);
        scheduler.start(&mirror);
        time::sleep(Duration::from_secs(11)).await;

        assert_eq!(fake.call_count("list"), 1);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        assert_eq!(RefreshScheduler::new(Duration::ZERO).interval(), MIN_INTERVAL);
    }
}
