use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dashboard_protocol::backend::DashboardBackend;
use dashboard_protocol::error::DashboardApiResult;
use dashboard_protocol::model::{effective_params, ExecutionResultMap};

use crate::cell::SnapshotCell;
use crate::snapshot::SnapshotPatch;

/// Turns "refresh requested" events into backend execution calls with
/// cancel-and-replace semantics: every request allocates a new
/// generation, and a result is applied only when its generation is
/// still the latest at resolution time. Responses may arrive in any
/// order; stale successes and stale failures are both discarded.
pub struct RefreshOrchestrator {
    backend: Arc<dyn DashboardBackend>,
    cell: Arc<SnapshotCell>,
    generation: AtomicU64,
    torn_down: AtomicBool,
}

impl RefreshOrchestrator {
    pub fn new(backend: Arc<dyn DashboardBackend>, cell: Arc<SnapshotCell>) -> Self {
        Self {
            backend,
            cell,
            generation: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Issues a refresh for the currently loaded dashboard. Returns the
    /// handle of the spawned call, or `None` when no dashboard is
    /// loaded or the orchestrator is torn down (no backend call, no
    /// loading flag).
    pub fn request_refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.torn_down.load(Ordering::SeqCst) {
            return None;
        }

        let snapshot = self.cell.get();
        let Some(dashboard) = snapshot.dashboard.as_ref() else {
            return None;
        };
        let dashboard_id = dashboard.id.clone();
        let params = effective_params(&snapshot.global_params);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cell.patch(SnapshotPatch {
            is_loading: Some(true),
            error: Some(None),
            ..SnapshotPatch::default()
        });

        let orchestrator = Arc::clone(self);
        Some(tokio::spawn(async move {
            let result = orchestrator
                .backend
                .refresh_execution(&dashboard_id, &params)
                .await;
            orchestrator.apply_result(generation, result);
        }))
    }

    /// Discards every in-flight call without issuing a new one. Used on
    /// snapshot reset so results for the previous dashboard never land.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// After teardown no result is ever applied, even the latest one.
    pub fn shutdown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    fn apply_result(&self, generation: u64, result: DashboardApiResult<ExecutionResultMap>) {
        let patch = match result {
            Ok(data_map) => SnapshotPatch {
                is_loading: Some(false),
                loading_widget_ids: Some(Vec::new()),
                data_map: Some(data_map),
                last_updated: Some(OffsetDateTime::now_utc()),
                ..SnapshotPatch::default()
            },
            Err(error) => {
                warn!(%error, "dashboard refresh failed");
                SnapshotPatch {
                    is_loading: Some(false),
                    loading_widget_ids: Some(Vec::new()),
                    error: Some(Some(error.to_string())),
                    ..SnapshotPatch::default()
                }
            }
        };

        // The generation and teardown checks share the snapshot lock
        // with the write, so a result validated here cannot be
        // overtaken by a newer generation before it lands.
        let applied = self.cell.mutate_if(|_current| {
            if self.torn_down.load(Ordering::SeqCst)
                || generation != self.generation.load(Ordering::SeqCst)
            {
                return None;
            }
            Some(patch)
        });
        if applied.is_none() {
            debug!(generation, "discarding superseded refresh result");
        }
    }
}
