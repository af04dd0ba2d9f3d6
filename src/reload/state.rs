//! Published handler state.
//!
//! # Responsibilities
//! - Hold the current handler instance and its route table as one snapshot
//! - Let requests read it without locks
//! - Let the reload orchestrator replace it atomically
//!
//! # Design Decisions
//! - Handler and routes live in the same `Arc`, so a reader can never pair a
//!   new route table with a stale handler
//! - Readers keep the snapshot they loaded for the whole request
//! - Empty until the first successful reload

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::handler::Handler;
use crate::routing::RouteTable;

/// One published generation of the handler.
pub struct AppSnapshot {
    pub handler: Arc<dyn Handler>,
    pub routes: RouteTable,
    /// Monotonic reload counter, starting at 1.
    pub generation: u64,
    /// Artifact the handler was loaded from.
    pub filename: String,
}

impl std::fmt::Debug for AppSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSnapshot")
            .field("generation", &self.generation)
            .field("filename", &self.filename)
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

/// Process-wide cell holding the current snapshot.
#[derive(Clone, Default)]
pub struct SharedState {
    current: Arc<ArcSwapOption<AppSnapshot>>,
    generation: Arc<AtomicU64>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot to serve a request with, if anything is loaded.
    pub fn load(&self) -> Option<Arc<AppSnapshot>> {
        self.current.load_full()
    }

    /// Replace handler and routes together.
    pub fn publish(&self, handler: Arc<dyn Handler>, routes: RouteTable, filename: &str) -> Arc<AppSnapshot> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(AppSnapshot {
            handler,
            routes,
            generation,
            filename: filename.to_string(),
        });
        self.current.store(Some(snapshot.clone()));
        snapshot
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }
}
