use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::snapshot::{DashboardSnapshot, SnapshotPatch};

pub const DEFAULT_SNAPSHOT_BUFFER_CAPACITY: usize = 64;

/// Owns the authoritative snapshot. Patches are serialized through a
/// single lock and each resulting snapshot is fanned out whole to
/// subscribers, so readers only ever see complete states.
#[derive(Debug)]
pub struct SnapshotCell {
    current: Mutex<Arc<DashboardSnapshot>>,
    sender: broadcast::Sender<Arc<DashboardSnapshot>>,
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_BUFFER_CAPACITY)
    }
}

impl SnapshotCell {
    pub fn new(buffer_capacity: usize) -> Self {
        assert!(
            buffer_capacity > 0,
            "snapshot buffer capacity must be greater than 0"
        );

        let (sender, _receiver) = broadcast::channel(buffer_capacity);
        Self {
            current: Mutex::new(Arc::new(DashboardSnapshot::default())),
            sender,
        }
    }

    pub fn get(&self) -> Arc<DashboardSnapshot> {
        Arc::clone(
            &self
                .current
                .lock()
                .expect("dashboard snapshot lock poisoned"),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DashboardSnapshot>> {
        self.sender.subscribe()
    }

    pub fn patch(&self, patch: SnapshotPatch) -> Arc<DashboardSnapshot> {
        let next = {
            let mut current = self
                .current
                .lock()
                .expect("dashboard snapshot lock poisoned");
            let next = Arc::new(patch.apply(&current));
            *current = Arc::clone(&next);
            next
        };
        let _ = self.sender.send(Arc::clone(&next));
        next
    }

    /// Computes a patch from the snapshot it will apply to, under the
    /// same lock. Read-modify-write edits of the widget list go through
    /// here so no other patch can interleave.
    pub fn mutate(
        &self,
        build: impl FnOnce(&DashboardSnapshot) -> SnapshotPatch,
    ) -> Arc<DashboardSnapshot> {
        let next = {
            let mut current = self
                .current
                .lock()
                .expect("dashboard snapshot lock poisoned");
            let next = Arc::new(build(&current).apply(&current));
            *current = Arc::clone(&next);
            next
        };
        let _ = self.sender.send(Arc::clone(&next));
        next
    }

    /// Like [`SnapshotCell::mutate`] but the closure may decline:
    /// nothing is applied or published when it returns `None`. The
    /// decision is made under the snapshot lock, so a caller that
    /// validates state in the closure cannot be overtaken by another
    /// patch between validation and write.
    pub fn mutate_if(
        &self,
        build: impl FnOnce(&DashboardSnapshot) -> Option<SnapshotPatch>,
    ) -> Option<Arc<DashboardSnapshot>> {
        let next = {
            let mut current = self
                .current
                .lock()
                .expect("dashboard snapshot lock poisoned");
            let next = Arc::new(build(&current)?.apply(&current));
            *current = Arc::clone(&next);
            next
        };
        let _ = self.sender.send(Arc::clone(&next));
        Some(next)
    }

    /// Wholesale replacement, used when a dashboard id changes.
    pub fn replace(&self, snapshot: DashboardSnapshot) -> Arc<DashboardSnapshot> {
        let next = {
            let mut current = self
                .current
                .lock()
                .expect("dashboard snapshot lock poisoned");
            let next = Arc::new(snapshot);
            *current = Arc::clone(&next);
            next
        };
        let _ = self.sender.send(Arc::clone(&next));
        next
    }
}
