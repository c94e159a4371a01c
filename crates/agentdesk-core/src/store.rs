//! In-memory store backing every resource trait.
//!
//! All collections sit behind a single async mutex, so each operation
//! (including the knowledge-base aggregation it triggers) runs to
//! completion before the next one observes the data. Nothing is persisted;
//! the store lives exactly as long as the process that built it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::entities::{
    Agent, Document, KnowledgeBase, MenuItem, Plugin, Session, UserProfile, Workflow,
};
use crate::ids::IdRegistry;
use crate::tasks::DeferredTasks;

/// Tunables handed to the store at construction.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// How long simulated document processing takes.
    pub processing_delay: Duration,
    /// Recorded as `createdBy` on new knowledge bases.
    pub default_owner: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_millis(1500),
            default_owner: "admin".to_owned(),
        }
    }
}

/// Every collection, guarded together.
#[derive(Debug)]
pub(crate) struct Collections {
    pub(crate) agents: Vec<Agent>,
    pub(crate) agent_ids: IdRegistry,
    /// Agent `sessionId` handles and workflow run session ids.
    pub(crate) handles: IdRegistry,

    pub(crate) sessions: HashMap<String, Vec<Session>>,
    pub(crate) session_ids: IdRegistry,

    pub(crate) knowledge_bases: Vec<KnowledgeBase>,
    pub(crate) knowledge_base_ids: IdRegistry,
    pub(crate) documents: HashMap<String, Vec<Document>>,
    pub(crate) document_ids: IdRegistry,

    pub(crate) workflows: Vec<Workflow>,
    pub(crate) workflow_ids: IdRegistry,

    pub(crate) plugins: Vec<Plugin>,
    pub(crate) plugin_ids: IdRegistry,

    pub(crate) users: Vec<UserProfile>,
    pub(crate) menus: Vec<MenuItem>,
}

impl Collections {
    fn new() -> Self {
        Self {
            agents: Vec::new(),
            agent_ids: IdRegistry::new(),
            handles: IdRegistry::new(),
            sessions: HashMap::new(),
            session_ids: IdRegistry::new(),
            knowledge_bases: Vec::new(),
            knowledge_base_ids: IdRegistry::new(),
            documents: HashMap::new(),
            document_ids: IdRegistry::new(),
            workflows: Vec::new(),
            workflow_ids: IdRegistry::new(),
            plugins: Vec::new(),
            plugin_ids: IdRegistry::new(),
            users: vec![UserProfile::default_admin()],
            menus: MenuItem::defaults(),
        }
    }
}

/// Cheaply cloneable handle to the shared collections.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
    tasks: Arc<DeferredTasks>,
    settings: Arc<StoreSettings>,
}

impl MemoryStore {
    /// An empty store holding only the default user and menus.
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Collections::new())),
            tasks: Arc::new(DeferredTasks::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Background tasks currently scheduled against this store.
    pub fn tasks(&self) -> &DeferredTasks {
        &self.tasks
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().await
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}
