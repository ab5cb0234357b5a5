use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use dashboard_protocol::backend::{DashboardBackend, WidgetCreate, WidgetUpdate};
use dashboard_protocol::ids::{DashboardId, WidgetId};
use dashboard_protocol::model::{Dashboard, GlobalParams, Widget};

use crate::cell::{SnapshotCell, DEFAULT_SNAPSHOT_BUFFER_CAPACITY};
use crate::error::{DashboardStoreError, DashboardStoreResult};
use crate::mutations::{duplicate_config, order_items, plan_reorder, DEFAULT_GRID_COLUMNS};
use crate::refresh::RefreshOrchestrator;
use crate::scheduler::{PollingScheduler, DEFAULT_POLL_INTERVAL};
use crate::snapshot::{DashboardSnapshot, SnapshotPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStoreConfig {
    pub poll_interval: Duration,
    pub grid_columns: u32,
    pub snapshot_buffer_capacity: usize,
}

impl Default for DashboardStoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            grid_columns: DEFAULT_GRID_COLUMNS,
            snapshot_buffer_capacity: DEFAULT_SNAPSHOT_BUFFER_CAPACITY,
        }
    }
}

/// Facade over the snapshot cell, refresh orchestrator and polling
/// scheduler. Exposes the command surface the rest of the application
/// mutates dashboard state through; UI code never writes the snapshot
/// directly.
#[derive(Clone)]
pub struct DashboardStore {
    backend: Arc<dyn DashboardBackend>,
    cell: Arc<SnapshotCell>,
    refresh: Arc<RefreshOrchestrator>,
    scheduler: Arc<PollingScheduler>,
    next_temp_id: Arc<AtomicU64>,
    grid_columns: u32,
}

impl DashboardStore {
    pub fn new(backend: Arc<dyn DashboardBackend>) -> Self {
        Self::with_config(backend, DashboardStoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn DashboardBackend>, config: DashboardStoreConfig) -> Self {
        assert!(
            config.grid_columns > 0,
            "grid column count must be greater than 0"
        );

        let cell = Arc::new(SnapshotCell::new(config.snapshot_buffer_capacity));
        let refresh = Arc::new(RefreshOrchestrator::new(
            Arc::clone(&backend),
            Arc::clone(&cell),
        ));
        let scheduler = Arc::new(PollingScheduler::new(config.poll_interval));

        Self {
            backend,
            cell,
            refresh,
            scheduler,
            next_temp_id: Arc::new(AtomicU64::new(0)),
            grid_columns: config.grid_columns,
        }
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.cell.get()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DashboardSnapshot>> {
        self.cell.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Discards the current snapshot wholesale and stops the polling
    /// timer. In-flight refresh results for the previous dashboard are
    /// invalidated so they can never land in the fresh snapshot.
    pub fn reset(&self) {
        self.scheduler.stop();
        self.refresh.invalidate();
        self.cell.replace(DashboardSnapshot::default());
    }

    /// Tears the store down for good: stops polling and prevents any
    /// late refresh result from mutating the discarded snapshot.
    pub fn shutdown(&self) {
        self.scheduler.stop();
        self.refresh.shutdown();
    }

    pub async fn load_dashboard(&self, dashboard_id: DashboardId) -> DashboardStoreResult<()> {
        self.reset();
        self.fetch_and_install(dashboard_id).await
    }

    /// Manual refresh request. Returns the handle of the issued call,
    /// or `None` when nothing was issued (no dashboard, or torn down).
    pub fn request_refresh(&self) -> Option<JoinHandle<()>> {
        self.refresh.request_refresh()
    }

    /// Filter synchronizer: applies an externally-sourced parameter map
    /// only when it differs from the last-synchronized copy, then
    /// requests a refresh. Equal input is a no-op, so redundant route
    /// emissions cause no refresh storm. Returns whether a refresh was
    /// requested.
    pub fn sync_filters(&self, params: GlobalParams) -> bool {
        let mut changed = false;
        self.cell.mutate(|current| {
            if current.global_params == params {
                SnapshotPatch::default()
            } else {
                changed = true;
                SnapshotPatch {
                    global_params: Some(params),
                    ..SnapshotPatch::default()
                }
            }
        });

        if changed {
            let _ = self.refresh.request_refresh();
        }
        changed
    }

    /// Route-level entry point: a navigation event carries a dashboard
    /// id and the filter params. An id change rebuilds the snapshot
    /// (params installed before the load's refresh); otherwise only the
    /// filters are synchronized.
    pub async fn handle_route_change(
        &self,
        dashboard_id: DashboardId,
        params: GlobalParams,
    ) -> DashboardStoreResult<()> {
        let current = self.cell.get();
        let unchanged = current
            .dashboard
            .as_ref()
            .is_some_and(|dashboard| dashboard.id == dashboard_id);

        if unchanged {
            self.sync_filters(params);
            return Ok(());
        }

        self.reset();
        self.cell.patch(SnapshotPatch {
            global_params: Some(params),
            ..SnapshotPatch::default()
        });
        self.fetch_and_install(dashboard_id).await
    }

    pub fn set_edit_mode(&self, enabled: bool) {
        self.cell.patch(SnapshotPatch {
            is_edit_mode: Some(enabled),
            ..SnapshotPatch::default()
        });
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.cell.patch(SnapshotPatch {
            is_auto_refresh_enabled: Some(enabled),
            ..SnapshotPatch::default()
        });
    }

    pub fn set_focused_widget(&self, widget_id: Option<WidgetId>) {
        self.cell.patch(SnapshotPatch {
            focused_widget_id: Some(widget_id),
            ..SnapshotPatch::default()
        });
    }

    /// Optimistic duplicate: a temp-id clone with offset layout is
    /// inserted immediately, swapped for the server-assigned widget on
    /// confirmation, and removed entirely on failure.
    pub async fn duplicate_widget(&self, widget_id: &WidgetId) -> DashboardStoreResult<Widget> {
        let dashboard_id = self.current_dashboard_id()?;
        let source = self.find_widget(widget_id)?;

        let temp_id = WidgetId::new(format!(
            "tmp-{}",
            self.next_temp_id.fetch_add(1, Ordering::SeqCst) + 1
        ));
        let temp = Widget {
            id: temp_id.clone(),
            dashboard_id: dashboard_id.clone(),
            title: source.title.clone(),
            kind: source.kind,
            visualization: source.visualization.clone(),
            config: duplicate_config(&source.config, self.grid_columns),
        };

        self.cell.mutate(|current| {
            let mut widgets = current.widgets.clone();
            widgets.push(temp.clone());
            SnapshotPatch {
                widgets: Some(widgets),
                ..SnapshotPatch::default()
            }
        });

        let request = WidgetCreate {
            title: temp.title.clone(),
            kind: temp.kind,
            visualization: temp.visualization.clone(),
            config: temp.config.clone(),
        };
        match self.backend.create_widget(&dashboard_id, request).await {
            Ok(confirmed) => {
                self.cell.mutate(|current| {
                    let mut widgets = current.widgets.clone();
                    if let Some(slot) = widgets.iter_mut().find(|widget| widget.id == temp_id) {
                        *slot = confirmed.clone();
                    }
                    SnapshotPatch {
                        widgets: Some(widgets),
                        loading_widget_ids: Some(vec![confirmed.id.clone()]),
                        ..SnapshotPatch::default()
                    }
                });
                let _ = self.refresh.request_refresh();
                Ok(confirmed)
            }
            Err(error) => {
                self.cell.mutate(|current| {
                    let widgets = current
                        .widgets
                        .iter()
                        .filter(|widget| widget.id != temp_id)
                        .cloned()
                        .collect();
                    SnapshotPatch {
                        widgets: Some(widgets),
                        ..SnapshotPatch::default()
                    }
                });
                Err(self.fail(DashboardStoreError::Backend(error)))
            }
        }
    }

    /// Optimistic delete. Rollback re-appends the original widget
    /// object unchanged, so concurrent local edits to other widgets
    /// survive a failed delete.
    pub async fn delete_widget(&self, widget_id: &WidgetId) -> DashboardStoreResult<()> {
        let original = self.find_widget(widget_id)?;

        self.cell.mutate(|current| {
            let widgets = current
                .widgets
                .iter()
                .filter(|widget| widget.id != original.id)
                .cloned()
                .collect();
            SnapshotPatch {
                widgets: Some(widgets),
                ..SnapshotPatch::default()
            }
        });

        match self.backend.delete_widget(widget_id).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.cell.mutate(|current| {
                    let mut widgets = current.widgets.clone();
                    widgets.push(original.clone());
                    SnapshotPatch {
                        widgets: Some(widgets),
                        ..SnapshotPatch::default()
                    }
                });
                Err(self.fail(DashboardStoreError::Backend(error)))
            }
        }
    }

    /// Optimistic in-place edit; rollback restores the original entry
    /// at its position.
    pub async fn update_widget(
        &self,
        widget_id: &WidgetId,
        update: WidgetUpdate,
    ) -> DashboardStoreResult<Widget> {
        let original = self.find_widget(widget_id)?;

        let mut edited = original.clone();
        if let Some(title) = update.title.clone() {
            edited.title = title;
        }
        if let Some(visualization) = update.visualization.clone() {
            edited.visualization = visualization;
        }
        if let Some(config) = update.config.clone() {
            edited.config = config;
        }
        self.replace_widget(&original.id, edited);

        match self.backend.update_widget(widget_id, update).await {
            Ok(confirmed) => {
                self.replace_widget(widget_id, confirmed.clone());
                Ok(confirmed)
            }
            Err(error) => {
                self.replace_widget(widget_id, original);
                Err(self.fail(DashboardStoreError::Backend(error)))
            }
        }
    }

    /// Drop handling for drag-and-drop: the recomputed list (dense
    /// 0-based order, grouping stripped) is applied locally before the
    /// backend call. Failure rolls back by reloading the dashboard,
    /// because the order recomputation is not trivially invertible.
    pub async fn reorder_widgets(
        &self,
        previous_index: usize,
        current_index: usize,
    ) -> DashboardStoreResult<()> {
        let dashboard_id = self.current_dashboard_id()?;

        let snapshot = self.cell.get();
        let Some(plan) = plan_reorder(&snapshot.widgets, previous_index, current_index) else {
            return Ok(());
        };
        let items = order_items(&plan);

        self.cell.patch(SnapshotPatch {
            widgets: Some(plan),
            ..SnapshotPatch::default()
        });

        match self.backend.reorder_widgets(&dashboard_id, &items).await {
            Ok(()) => Ok(()),
            Err(error) => {
                let error = self.fail(DashboardStoreError::Backend(error));
                if let Err(reload_error) = self.reload_dashboard(&dashboard_id).await {
                    warn!(%reload_error, "dashboard reload after failed reorder also failed");
                }
                Err(error)
            }
        }
    }

    /// Provisioning from a template or ad-hoc query: created
    /// server-side first (no optimistic insert), then the dashboard is
    /// reloaded for the authoritative position/id and a refresh is
    /// requested for the new widget's data.
    pub async fn provision_widget(&self, request: WidgetCreate) -> DashboardStoreResult<Widget> {
        let dashboard_id = self.current_dashboard_id()?;

        match self.backend.create_widget(&dashboard_id, request).await {
            Ok(widget) => {
                if let Err(reload_error) = self.reload_dashboard(&dashboard_id).await {
                    warn!(%reload_error, "dashboard reload after provisioning failed");
                }
                self.cell.patch(SnapshotPatch {
                    loading_widget_ids: Some(vec![widget.id.clone()]),
                    ..SnapshotPatch::default()
                });
                let _ = self.refresh.request_refresh();
                Ok(widget)
            }
            Err(error) => Err(self.fail(DashboardStoreError::Backend(error))),
        }
    }

    /// Replaces the current dashboard with the backend's default, then
    /// restarts polling and refreshes, like a load.
    pub async fn restore_default_dashboard(&self) -> DashboardStoreResult<()> {
        match self.backend.restore_default_dashboard().await {
            Ok(dashboard) => {
                self.reset();
                self.install_dashboard(dashboard);
                Ok(())
            }
            Err(error) => Err(self.fail(DashboardStoreError::Backend(error))),
        }
    }

    async fn fetch_and_install(&self, dashboard_id: DashboardId) -> DashboardStoreResult<()> {
        self.cell.patch(SnapshotPatch {
            is_loading: Some(true),
            error: Some(None),
            ..SnapshotPatch::default()
        });

        match self.backend.get_dashboard(&dashboard_id).await {
            Ok(dashboard) => {
                self.install_dashboard(dashboard);
                Ok(())
            }
            Err(error) => {
                let error = DashboardStoreError::Backend(error);
                self.cell.patch(SnapshotPatch {
                    is_loading: Some(false),
                    error: Some(Some(error.to_string())),
                    ..SnapshotPatch::default()
                });
                Err(error)
            }
        }
    }

    fn install_dashboard(&self, dashboard: Dashboard) {
        self.cell.patch(SnapshotPatch {
            dashboard: Some(Some(dashboard.clone())),
            widgets: Some(dashboard.widgets),
            is_loading: Some(false),
            ..SnapshotPatch::default()
        });
        self.scheduler
            .start(Arc::clone(&self.cell), Arc::clone(&self.refresh));
        let _ = self.refresh.request_refresh();
    }

    async fn reload_dashboard(&self, dashboard_id: &DashboardId) -> DashboardStoreResult<()> {
        match self.backend.get_dashboard(dashboard_id).await {
            Ok(dashboard) => {
                self.cell.patch(SnapshotPatch {
                    dashboard: Some(Some(dashboard.clone())),
                    widgets: Some(dashboard.widgets),
                    ..SnapshotPatch::default()
                });
                Ok(())
            }
            Err(error) => Err(DashboardStoreError::Backend(error)),
        }
    }

    fn current_dashboard_id(&self) -> DashboardStoreResult<DashboardId> {
        self.cell
            .get()
            .dashboard
            .as_ref()
            .map(|dashboard| dashboard.id.clone())
            .ok_or(DashboardStoreError::DashboardNotLoaded)
    }

    fn replace_widget(&self, widget_id: &WidgetId, replacement: Widget) {
        self.cell.mutate(|current| {
            let mut widgets = current.widgets.clone();
            if let Some(slot) = widgets.iter_mut().find(|widget| widget.id == *widget_id) {
                *slot = replacement;
            }
            SnapshotPatch {
                widgets: Some(widgets),
                ..SnapshotPatch::default()
            }
        });
    }

    fn find_widget(&self, widget_id: &WidgetId) -> DashboardStoreResult<Widget> {
        self.cell
            .get()
            .widgets
            .iter()
            .find(|widget| widget.id == *widget_id)
            .cloned()
            .ok_or_else(|| DashboardStoreError::WidgetNotFound(widget_id.as_str().to_owned()))
    }

    /// Backend failures surface through the snapshot's single
    /// most-recent error slot and are also returned to the caller.
    fn fail(&self, error: DashboardStoreError) -> DashboardStoreError {
        self.cell.patch(SnapshotPatch {
            error: Some(Some(error.to_string())),
            ..SnapshotPatch::default()
        });
        error
    }
}
