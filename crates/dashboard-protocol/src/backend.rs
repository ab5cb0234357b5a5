use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DashboardApiResult;
use crate::ids::{DashboardId, WidgetId};
use crate::model::{Dashboard, ExecutionResultMap, Widget, WidgetConfig, WidgetKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetCreate {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub visualization: String,
    pub config: WidgetConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WidgetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<WidgetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOrderItem {
    pub id: WidgetId,
    pub order: u32,
    pub group: Option<String>,
}

/// Client-side contract against the remote execution API. The store
/// never talks to the network directly; it goes through this seam.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    async fn get_dashboard(&self, dashboard_id: &DashboardId) -> DashboardApiResult<Dashboard>;

    async fn create_widget(
        &self,
        dashboard_id: &DashboardId,
        request: WidgetCreate,
    ) -> DashboardApiResult<Widget>;

    async fn update_widget(
        &self,
        widget_id: &WidgetId,
        request: WidgetUpdate,
    ) -> DashboardApiResult<Widget>;

    async fn delete_widget(&self, widget_id: &WidgetId) -> DashboardApiResult<()>;

    async fn reorder_widgets(
        &self,
        dashboard_id: &DashboardId,
        items: &[WidgetOrderItem],
    ) -> DashboardApiResult<()>;

    async fn restore_default_dashboard(&self) -> DashboardApiResult<Dashboard>;

    async fn refresh_execution(
        &self,
        dashboard_id: &DashboardId,
        params: &BTreeMap<String, String>,
    ) -> DashboardApiResult<ExecutionResultMap>;
}
