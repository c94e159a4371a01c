//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use agentdesk_core::{MemoryStore, StoreSettings};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// In-memory resource store; cheap to clone.
    pub store: MemoryStore,
}

impl AppState {
    /// Build state with an empty store configured from `config`.
    pub fn new(config: Config) -> Self {
        let store = MemoryStore::new(StoreSettings {
            processing_delay: config.processing_delay,
            ..StoreSettings::default()
        });
        Self { config: Arc::new(config), store }
    }
}
