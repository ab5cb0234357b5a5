use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cell::SnapshotCell;
use crate::refresh::RefreshOrchestrator;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300_000);

/// Emits refresh requests on a fixed period while auto refresh is on
/// and edit mode is off. The gate is evaluated at every tick, not
/// latched at start time.
#[derive(Debug)]
pub struct PollingScheduler {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PollingScheduler {
    pub fn new(interval: Duration) -> Self {
        assert!(
            !interval.is_zero(),
            "poll interval must be greater than zero"
        );
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    /// Starting while already running replaces the previous timer, so
    /// there is never more than one.
    pub fn start(&self, cell: Arc<SnapshotCell>, orchestrator: Arc<RefreshOrchestrator>) {
        // Arm the interval here so start-time is the timer's epoch even
        // if the spawned task is not polled immediately.
        let mut ticker = tokio::time::interval(self.interval);
        let task = tokio::spawn(async move {
            // The first interval tick completes immediately; polling
            // starts one full period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = cell.get();
                if snapshot.is_auto_refresh_enabled && !snapshot.is_edit_mode {
                    let _ = orchestrator.request_refresh();
                } else {
                    debug!("polling tick suppressed by auto-refresh/edit-mode gate");
                }
            }
        });

        let mut slot = self.task.lock().expect("polling scheduler lock poisoned");
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Idempotent; stopping a stopped scheduler is a no-op.
    pub fn stop(&self) {
        let mut slot = self.task.lock().expect("polling scheduler lock poisoned");
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("polling scheduler lock poisoned")
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cell::SnapshotCell;
    use crate::refresh::RefreshOrchestrator;
    use crate::snapshot::SnapshotPatch;
    use crate::test_support::{empty_dashboard, CountingBackend};

    use super::PollingScheduler;

    const POLL: Duration = Duration::from_millis(300_000);

    fn fixture() -> (Arc<CountingBackend>, Arc<SnapshotCell>, Arc<RefreshOrchestrator>) {
        let backend = Arc::new(CountingBackend::default());
        let cell = Arc::new(SnapshotCell::default());
        cell.patch(SnapshotPatch {
            dashboard: Some(Some(empty_dashboard("d-1"))),
            ..SnapshotPatch::default()
        });
        let orchestrator = Arc::new(RefreshOrchestrator::new(backend.clone(), cell.clone()));
        (backend, cell, orchestrator)
    }

    async fn advance_one_period() {
        tokio::time::advance(POLL).await;
        // Let the tick task and the spawned refresh call run.
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_emit_refresh_requests_on_the_period() {
        let (backend, cell, orchestrator) = fixture();
        let scheduler = PollingScheduler::new(POLL);
        scheduler.start(cell.clone(), orchestrator.clone());

        advance_one_period().await;
        advance_one_period().await;

        assert_eq!(backend.refresh_calls(), 2);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn edit_mode_gates_ticks_until_cleared() {
        let (backend, cell, orchestrator) = fixture();
        cell.patch(SnapshotPatch {
            is_edit_mode: Some(true),
            ..SnapshotPatch::default()
        });
        let scheduler = PollingScheduler::new(POLL);
        scheduler.start(cell.clone(), orchestrator.clone());

        advance_one_period().await;
        assert_eq!(backend.refresh_calls(), 0);

        cell.patch(SnapshotPatch {
            is_edit_mode: Some(false),
            ..SnapshotPatch::default()
        });
        advance_one_period().await;
        assert_eq!(backend.refresh_calls(), 1);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_auto_refresh_suppresses_ticks() {
        let (backend, cell, orchestrator) = fixture();
        cell.patch(SnapshotPatch {
            is_auto_refresh_enabled: Some(false),
            ..SnapshotPatch::default()
        });
        let scheduler = PollingScheduler::new(POLL);
        scheduler.start(cell.clone(), orchestrator.clone());

        advance_one_period().await;
        advance_one_period().await;

        assert_eq!(backend.refresh_calls(), 0);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_previous_timer() {
        let (backend, cell, orchestrator) = fixture();
        let scheduler = PollingScheduler::new(POLL);
        scheduler.start(cell.clone(), orchestrator.clone());
        scheduler.start(cell.clone(), orchestrator.clone());
        assert!(scheduler.is_running());

        advance_one_period().await;

        // A duplicate timer would have produced two calls per period.
        assert_eq!(backend.refresh_calls(), 1);
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_emits_nothing() {
        let (backend, cell, orchestrator) = fixture();
        let scheduler = PollingScheduler::new(POLL);
        scheduler.start(cell.clone(), orchestrator.clone());
        scheduler.stop();
        scheduler.stop();

        advance_one_period().await;

        assert_eq!(backend.refresh_calls(), 0);
    }
}
