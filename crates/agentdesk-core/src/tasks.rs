//! Deferred background work keyed by the id of the record it targets.

use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks in-flight tokio task abort handles, keyed by target id.
#[derive(Default)]
pub struct DeferredTasks {
    handles: Mutex<HashMap<String, tokio::task::AbortHandle>>,
}

impl std::fmt::Debug for DeferredTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeferredTasks({} handles)", self.len())
    }
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `id`, aborting any task already registered
    /// under the same id.
    pub fn insert(&self, id: impl Into<String>, handle: tokio::task::AbortHandle) {
        if let Ok(mut map) = self.handles.lock() {
            if let Some(previous) = map.insert(id.into(), handle) {
                previous.abort();
            }
        }
    }

    /// Cancel and remove a task. Returns `true` if a handle was found.
    pub fn cancel(&self, id: &str) -> bool {
        if let Ok(mut map) = self.handles.lock() {
            if let Some(h) = map.remove(id) {
                h.abort();
                return true;
            }
        }
        false
    }

    /// Forget a task that finished on its own.
    pub fn remove(&self, id: &str) {
        if let Ok(mut map) = self.handles.lock() {
            map.remove(id);
        }
    }

    /// Cancel every registered task, e.g. on shutdown.
    pub fn abort_all(&self) {
        if let Ok(mut map) = self.handles.lock() {
            for (_, h) in map.drain() {
                h.abort();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
