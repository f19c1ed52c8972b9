use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::graph::WaypointGraph;

/// Handle to the currently published graph.
///
/// Readers take a [`snapshot`](Self::snapshot) and query it without holding
/// the lock. Regeneration builds a whole new graph and publishes it with
/// [`replace`](Self::replace), so a reader sees either the old graph or the new
/// one, never a mix.
#[derive(Debug, Clone, Default)]
pub struct SharedTrack(Arc<RwLock<Arc<WaypointGraph>>>);

impl SharedTrack {
    pub fn new(graph: WaypointGraph) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(graph))))
    }

    pub fn snapshot(&self) -> Arc<WaypointGraph> {
        self.0.read().clone()
    }

    /// Publishes `graph` and returns the one it replaced.
    pub fn replace(&self, graph: WaypointGraph) -> Arc<WaypointGraph> {
        std::mem::replace(&mut *self.0.write(), Arc::new(graph))
    }
}

/// Cooperative abort flag for an extraction run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
