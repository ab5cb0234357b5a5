use thiserror::Error;

use dashboard_protocol::error::DashboardApiError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DashboardStoreError {
    #[error("dashboard store has no loaded dashboard")]
    DashboardNotLoaded,
    #[error("dashboard store widget not found: {0}")]
    WidgetNotFound(String),
    #[error("{0}")]
    Backend(DashboardApiError),
}

pub type DashboardStoreResult<T> = Result<T, DashboardStoreError>;
