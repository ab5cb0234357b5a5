use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{DashboardId, WidgetId};

/// Dashboard-wide filter values applied to every widget execution.
/// `None` marks a filter that is present in the route but cleared.
pub type GlobalParams = BTreeMap<String, Option<String>>;

/// Drops cleared entries and yields the params actually sent to the
/// backend execution call.
pub fn effective_params(params: &GlobalParams) -> BTreeMap<String, String> {
    params
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|value| (key.clone(), value.clone())))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Sql,
    Http,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub w: u32,
    #[serde(default)]
    pub h: u32,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Type-specific settings: query text, HTTP params, chart key
    /// mappings. Opaque to the store.
    #[serde(flatten)]
    pub options: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub dashboard_id: DashboardId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub visualization: String,
    pub config: WidgetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    pub name: String,
    pub owner_id: String,
    pub widgets: Vec<Widget>,
}

/// Per-widget execution payload. Produced by the backend; the store
/// treats it as opaque and replaces the whole map on each refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Table {
        columns: Vec<String>,
        data: Vec<Vec<Value>>,
    },
    Error {
        error: String,
    },
    Scalar {
        value: Value,
    },
}

pub type ExecutionResultMap = HashMap<WidgetId, ExecutionResult>;
