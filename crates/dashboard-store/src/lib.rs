//! Client-side state container for dashboard data: immutable snapshots,
//! generation-guarded refresh, background polling and optimistic widget
//! mutations over a [`dashboard_protocol::backend::DashboardBackend`].

pub mod cell;
pub mod error;
pub mod mutations;
pub mod refresh;
pub mod scheduler;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use cell::{SnapshotCell, DEFAULT_SNAPSHOT_BUFFER_CAPACITY};
pub use error::{DashboardStoreError, DashboardStoreResult};
pub use mutations::DEFAULT_GRID_COLUMNS;
pub use refresh::RefreshOrchestrator;
pub use scheduler::{PollingScheduler, DEFAULT_POLL_INTERVAL};
pub use snapshot::{DashboardSnapshot, SnapshotPatch};
pub use store::{DashboardStore, DashboardStoreConfig};
