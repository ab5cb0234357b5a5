//! Shared dashboard data model and backend contract.

pub mod backend;
pub mod error;
pub mod ids;
pub mod model;

pub use backend::{DashboardBackend, WidgetCreate, WidgetOrderItem, WidgetUpdate};
pub use error::{DashboardApiError, DashboardApiResult};
pub use ids::{DashboardId, WidgetId};
pub use model::{
    effective_params, Dashboard, ExecutionResult, ExecutionResultMap, GlobalParams, Widget,
    WidgetConfig, WidgetKind,
};
