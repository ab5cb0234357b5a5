use time::OffsetDateTime;

use dashboard_protocol::ids::WidgetId;
use dashboard_protocol::model::{Dashboard, ExecutionResultMap, GlobalParams, Widget};

/// The aggregate state visible to the rest of the application. Every
/// update produces a new snapshot; readers never observe a torn state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub dashboard: Option<Dashboard>,
    pub widgets: Vec<Widget>,
    /// Keyed by widget id as of the last successful refresh. Stale
    /// entries for since-deleted widgets are tolerated, not pruned.
    pub data_map: ExecutionResultMap,
    pub is_loading: bool,
    pub loading_widget_ids: Vec<WidgetId>,
    /// Single most-recent message slot; a new error overwrites the
    /// previous one.
    pub error: Option<String>,
    pub global_params: GlobalParams,
    pub is_edit_mode: bool,
    pub focused_widget_id: Option<WidgetId>,
    pub last_updated: Option<OffsetDateTime>,
    pub is_auto_refresh_enabled: bool,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            dashboard: None,
            widgets: Vec::new(),
            data_map: ExecutionResultMap::new(),
            is_loading: false,
            loading_widget_ids: Vec::new(),
            error: None,
            global_params: GlobalParams::new(),
            is_edit_mode: false,
            focused_widget_id: None,
            last_updated: None,
            is_auto_refresh_enabled: true,
        }
    }
}

/// Partial update merged atomically into the current snapshot.
/// Clearable slots use a nested `Option`: the outer level selects the
/// field, the inner level is the new value (possibly `None`).
#[derive(Debug, Clone, Default)]
pub struct SnapshotPatch {
    pub dashboard: Option<Option<Dashboard>>,
    pub widgets: Option<Vec<Widget>>,
    pub data_map: Option<ExecutionResultMap>,
    pub is_loading: Option<bool>,
    pub loading_widget_ids: Option<Vec<WidgetId>>,
    pub error: Option<Option<String>>,
    pub global_params: Option<GlobalParams>,
    pub is_edit_mode: Option<bool>,
    pub focused_widget_id: Option<Option<WidgetId>>,
    pub last_updated: Option<OffsetDateTime>,
    pub is_auto_refresh_enabled: Option<bool>,
}

impl SnapshotPatch {
    pub fn apply(self, current: &DashboardSnapshot) -> DashboardSnapshot {
        DashboardSnapshot {
            dashboard: self.dashboard.unwrap_or_else(|| current.dashboard.clone()),
            widgets: self.widgets.unwrap_or_else(|| current.widgets.clone()),
            data_map: self.data_map.unwrap_or_else(|| current.data_map.clone()),
            is_loading: self.is_loading.unwrap_or(current.is_loading),
            loading_widget_ids: self
                .loading_widget_ids
                .unwrap_or_else(|| current.loading_widget_ids.clone()),
            error: self.error.unwrap_or_else(|| current.error.clone()),
            global_params: self
                .global_params
                .unwrap_or_else(|| current.global_params.clone()),
            is_edit_mode: self.is_edit_mode.unwrap_or(current.is_edit_mode),
            focused_widget_id: self
                .focused_widget_id
                .unwrap_or_else(|| current.focused_widget_id.clone()),
            last_updated: self.last_updated.or(current.last_updated),
            is_auto_refresh_enabled: self
                .is_auto_refresh_enabled
                .unwrap_or(current.is_auto_refresh_enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardSnapshot, SnapshotPatch};

    #[test]
    fn default_snapshot_starts_idle_with_auto_refresh_enabled() {
        let snapshot = DashboardSnapshot::default();

        assert!(snapshot.dashboard.is_none());
        assert!(!snapshot.is_loading);
        assert!(snapshot.error.is_none());
        assert!(snapshot.is_auto_refresh_enabled);
        assert!(snapshot.last_updated.is_none());
    }

    #[test]
    fn patch_only_touches_selected_fields() {
        let base = DashboardSnapshot {
            is_edit_mode: true,
            error: Some("boom".to_owned()),
            ..DashboardSnapshot::default()
        };

        let patched = SnapshotPatch {
            is_loading: Some(true),
            ..SnapshotPatch::default()
        }
        .apply(&base);

        assert!(patched.is_loading);
        assert!(patched.is_edit_mode);
        assert_eq!(patched.error.as_deref(), Some("boom"));
    }

    #[test]
    fn patch_clears_nested_option_slots() {
        let base = DashboardSnapshot {
            error: Some("stale".to_owned()),
            focused_widget_id: Some("w-1".into()),
            ..DashboardSnapshot::default()
        };

        let patched = SnapshotPatch {
            error: Some(None),
            focused_widget_id: Some(None),
            ..SnapshotPatch::default()
        }
        .apply(&base);

        assert!(patched.error.is_none());
        assert!(patched.focused_widget_id.is_none());
    }
}
