//! Per-session worker registry
//!
//! Each engine keeps one worker per session, created on first request and
//! reused for the session's lifetime. Entries are removed when the session
//! releases its workers.

use dashmap::DashMap;
use nodex_core::SessionId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Workers of one engine, keyed by session
pub struct WorkerRegistry<W> {
    workers: DashMap<SessionId, Arc<Mutex<W>>>,
}

impl<W> Default for WorkerRegistry<W> {
    fn default() -> Self {
        WorkerRegistry {
            workers: DashMap::new(),
        }
    }
}

impl<W> WorkerRegistry<W> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's worker, created with `create` if it has none yet
    pub fn get_or_create(&self, session: SessionId, create: impl FnOnce() -> W) -> Arc<Mutex<W>> {
        Arc::clone(
            self.workers
                .entry(session)
                .or_insert_with(|| Arc::new(Mutex::new(create())))
                .value(),
        )
    }

    /// The session's worker, if created
    pub fn get(&self, session: SessionId) -> Option<Arc<Mutex<W>>> {
        self.workers.get(&session).map(|w| Arc::clone(w.value()))
    }

    /// Drop the session's worker; returns whether it existed
    pub fn release(&self, session: SessionId) -> bool {
        self.workers.remove(&session).is_some()
    }

    /// Number of live workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether no session holds a worker
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Drop every worker
    pub fn clear(&self) {
        self.workers.clear();
    }
}
