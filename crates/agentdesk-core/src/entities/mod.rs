//! Resource types and their store traits.
//!
//! Each resource module defines the record type, its request types, and a
//! `*Store` trait describing the operations on it. [`crate::MemoryStore`]
//! implements every trait; a different backing store only has to implement
//! the same traits.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

pub mod agent;
pub mod knowledge;
pub mod plugin;
pub mod profile;
pub mod session;
pub mod workflow;

pub use agent::{
    Agent, AgentStatus, AgentStore, ChatReply, ChatRequest, CreateAgentRequest, StatusChange,
    UpdateAgentRequest,
};
pub use knowledge::{
    CreateKnowledgeBaseRequest, Document, DocumentStatus, DocumentUpload, KnowledgeBase,
    KnowledgeStore, SearchHit, SearchRequest, SearchResponse, UpdateKnowledgeBaseRequest,
};
pub use plugin::{
    CreatePluginRequest, Plugin, PluginStatus, PluginStore, PluginTestRequest, PluginTemplate,
    PluginTestResult, PluginTool, PublishStatus, TestStatus, UpdatePluginRequest,
};
pub use profile::{MenuItem, ProfileStore, UpdateProfileRequest, UserProfile};
pub use session::{CreateSessionRequest, RenameSessionRequest, Session, SessionStore};
pub use workflow::{
    CreateWorkflowRequest, ExecuteWorkflowRequest, NodeResult, SaveWorkflowRequest, TriggerType,
    UpdateWorkflowRequest, Workflow, WorkflowExecution, WorkflowStatus, WorkflowStore,
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationError;

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Payload returned by every delete operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    pub id: String,
}

/// Trim `value`, mapping blank strings to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// `validator` hook rejecting empty and whitespace-only strings.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}
