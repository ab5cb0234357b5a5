use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DashboardApiError {
    #[error("dashboard api configuration error: {0}")]
    Configuration(String),
    #[error("dashboard api unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("dashboard api resource not found: {0}")]
    NotFound(String),
    #[error("dashboard api request rejected: {0}")]
    Rejected(String),
    #[error("dashboard api internal error: {0}")]
    Internal(String),
}

pub type DashboardApiResult<T> = Result<T, DashboardApiError>;
