//! Shared fixtures for store tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use dashboard_protocol::backend::{DashboardBackend, WidgetCreate, WidgetOrderItem, WidgetUpdate};
use dashboard_protocol::error::{DashboardApiError, DashboardApiResult};
use dashboard_protocol::ids::{DashboardId, WidgetId};
use dashboard_protocol::model::{
    Dashboard, ExecutionResultMap, Widget, WidgetConfig, WidgetKind,
};

pub fn empty_dashboard(id: &str) -> Dashboard {
    Dashboard {
        id: DashboardId::new(id),
        name: format!("{id} dashboard"),
        owner_id: "u-1".to_owned(),
        widgets: Vec::new(),
    }
}

pub fn widget(dashboard_id: &str, widget_id: &str, order: u32) -> Widget {
    Widget {
        id: WidgetId::new(widget_id),
        dashboard_id: DashboardId::new(dashboard_id),
        title: format!("widget {widget_id}"),
        kind: WidgetKind::Sql,
        visualization: "table".to_owned(),
        config: WidgetConfig {
            x: order,
            y: 0,
            w: 4,
            h: 3,
            order,
            group: None,
            options: serde_json::Map::new(),
        },
    }
}

/// Backend that resolves every refresh immediately with an empty map
/// and counts the calls. Used by timer tests where only "did a refresh
/// get requested" matters.
#[derive(Default)]
pub struct CountingBackend {
    refreshes: AtomicUsize,
}

impl CountingBackend {
    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DashboardBackend for CountingBackend {
    async fn get_dashboard(&self, dashboard_id: &DashboardId) -> DashboardApiResult<Dashboard> {
        Ok(empty_dashboard(dashboard_id.as_str()))
    }

    async fn create_widget(
        &self,
        _dashboard_id: &DashboardId,
        _request: WidgetCreate,
    ) -> DashboardApiResult<Widget> {
        Err(DashboardApiError::Internal("not scripted".to_owned()))
    }

    async fn update_widget(
        &self,
        _widget_id: &WidgetId,
        _request: WidgetUpdate,
    ) -> DashboardApiResult<Widget> {
        Err(DashboardApiError::Internal("not scripted".to_owned()))
    }

    async fn delete_widget(&self, _widget_id: &WidgetId) -> DashboardApiResult<()> {
        Err(DashboardApiError::Internal("not scripted".to_owned()))
    }

    async fn reorder_widgets(
        &self,
        _dashboard_id: &DashboardId,
        _items: &[WidgetOrderItem],
    ) -> DashboardApiResult<()> {
        Err(DashboardApiError::Internal("not scripted".to_owned()))
    }

    async fn restore_default_dashboard(&self) -> DashboardApiResult<Dashboard> {
        Err(DashboardApiError::Internal("not scripted".to_owned()))
    }

    async fn refresh_execution(
        &self,
        _dashboard_id: &DashboardId,
        _params: &BTreeMap<String, String>,
    ) -> DashboardApiResult<ExecutionResultMap> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionResultMap::new())
    }
}
