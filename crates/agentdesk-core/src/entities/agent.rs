use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::chat::{
    ChatEntry, ChatHistory, ChatRole, ChatTurn, DEFAULT_CONTEXT_ROUNDS, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, synthesize_reply,
};
use crate::entities::{Deleted, SessionStore, non_blank, not_blank, now_millis};
use crate::error::{CoreError, CoreResult};
use crate::ids::{RESOURCE_ID_LEN, SESSION_ID_LEN};
use crate::pagination::{Listable, Page, PageQuery, paginate};
use crate::store::MemoryStore;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub model: String,
    pub prompt: String,
    /// Persona markdown; a non-blank value marks every reply.
    pub profile_md: Option<String>,
    pub status: AgentStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub session_id: String,
    #[schema(value_type = Vec<ChatEntry>)]
    pub chat_history: ChatHistory,
}

impl Listable for Agent {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }

    fn status_str(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRequest {
    #[validate(required(message = "is required"), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// Defaults to `gpt-4o-mini`.
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub profile_md: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub profile_md: Option<String>,
}

/// Result of publish/unpublish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub id: String,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub model: Option<String>,
    pub context_rounds: Option<i64>,
    pub max_tokens: Option<usize>,
    /// Ask for a Server-Sent Events response instead of JSON.
    pub stream: Option<bool>,
}

impl ChatRequest {
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    pub fn into_turn(self) -> ChatTurn {
        ChatTurn {
            message: self.message.unwrap_or_default(),
            model: non_blank(self.model).unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            context_rounds: self.context_rounds.unwrap_or(DEFAULT_CONTEXT_ROUNDS),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    pub role: ChatRole,
    pub content: String,
}

pub trait AgentStore: Send + Sync + 'static {
    fn list_agents(&self, query: &PageQuery) -> impl Future<Output = CoreResult<Page<Agent>>> + Send;
    fn create_agent(&self, req: CreateAgentRequest) -> impl Future<Output = CoreResult<Agent>> + Send;
    fn get_agent(&self, id: &str) -> impl Future<Output = CoreResult<Agent>> + Send;
    fn update_agent(
        &self,
        id: &str,
        req: UpdateAgentRequest,
    ) -> impl Future<Output = CoreResult<Agent>> + Send;
    /// Removes the agent together with its sessions.
    fn delete_agent(&self, id: &str) -> impl Future<Output = CoreResult<Deleted>> + Send;
    fn publish_agent(&self, id: &str) -> impl Future<Output = CoreResult<StatusChange>> + Send;
    fn unpublish_agent(&self, id: &str) -> impl Future<Output = CoreResult<StatusChange>> + Send;
    /// Run one simulated chat turn and record it in the agent's history.
    fn chat(&self, id: &str, turn: ChatTurn) -> impl Future<Output = CoreResult<ChatReply>> + Send;
    fn chat_history(
        &self,
        id: &str,
        limit: i64,
    ) -> impl Future<Output = CoreResult<Vec<ChatEntry>>> + Send;
}

impl MemoryStore {
    /// Insert the sample agent shown on a fresh console.
    pub async fn seed_sample_agent(&self) -> CoreResult<Agent> {
        self.create_agent(CreateAgentRequest {
            name: Some("Customer Support Assistant".to_owned()),
            description: Some("Answers common product questions".to_owned()),
            prompt: Some("You are a friendly and concise support assistant.".to_owned()),
            ..CreateAgentRequest::default()
        })
        .await
    }

    async fn set_agent_status(&self, id: &str, publish: bool) -> CoreResult<StatusChange> {
        let change = {
            let mut data = self.lock().await;
            let agent = data
                .agents
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| CoreError::not_found("agent", id))?;
            if !publish && agent.status != AgentStatus::Published {
                return Err(CoreError::Validation(format!("agent {id} is not published")));
            }
            agent.status = if publish { AgentStatus::Published } else { AgentStatus::Draft };
            agent.updated_at = now_millis();
            StatusChange { id: agent.id.clone(), status: agent.status }
        };
        info!(agent_id = %id, status = %change.status, "agent status changed");

        if let Err(e) = self.clear_sessions(id).await {
            warn!(agent_id = %id, error = %e, "failed to clear agent sessions");
        }
        Ok(change)
    }
}

impl AgentStore for MemoryStore {
    async fn list_agents(&self, query: &PageQuery) -> CoreResult<Page<Agent>> {
        let data = self.lock().await;
        paginate(&data.agents, query)
    }

    async fn create_agent(&self, req: CreateAgentRequest) -> CoreResult<Agent> {
        req.validate()?;
        let mut data = self.lock().await;
        let now = now_millis();
        let agent = Agent {
            id: data.agent_ids.issue(RESOURCE_ID_LEN),
            name: req.name.unwrap_or_default().trim().to_owned(),
            description: req.description.unwrap_or_default(),
            model: non_blank(req.model).unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            prompt: req.prompt.unwrap_or_default(),
            profile_md: non_blank(req.profile_md),
            status: AgentStatus::Draft,
            created_at: now,
            updated_at: now,
            session_id: data.handles.issue(SESSION_ID_LEN),
            chat_history: ChatHistory::new(),
        };
        data.agents.insert(0, agent.clone());
        info!(agent_id = %agent.id, name = %agent.name, "agent created");
        Ok(agent)
    }

    async fn get_agent(&self, id: &str) -> CoreResult<Agent> {
        let data = self.lock().await;
        data.agents
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("agent", id))
    }

    async fn update_agent(&self, id: &str, req: UpdateAgentRequest) -> CoreResult<Agent> {
        req.validate()?;
        let mut data = self.lock().await;
        let agent = data
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found("agent", id))?;
        if let Some(name) = req.name {
            agent.name = name.trim().to_owned();
        }
        if let Some(description) = req.description {
            agent.description = description;
        }
        if let Some(model) = non_blank(req.model) {
            agent.model = model;
        }
        if let Some(prompt) = req.prompt {
            agent.prompt = prompt;
        }
        if let Some(profile_md) = req.profile_md {
            agent.profile_md = non_blank(Some(profile_md));
        }
        agent.updated_at = now_millis();
        debug!(agent_id = %id, "agent updated");
        Ok(agent.clone())
    }

    async fn delete_agent(&self, id: &str) -> CoreResult<Deleted> {
        let mut data = self.lock().await;
        let pos = data
            .agents
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found("agent", id))?;
        let removed = data.agents.remove(pos);
        let sessions = data.sessions.remove(id).map(|s| s.len()).unwrap_or(0);
        info!(agent_id = %id, sessions, "agent deleted");
        Ok(Deleted { id: removed.id })
    }

    async fn publish_agent(&self, id: &str) -> CoreResult<StatusChange> {
        self.set_agent_status(id, true).await
    }

    async fn unpublish_agent(&self, id: &str) -> CoreResult<StatusChange> {
        self.set_agent_status(id, false).await
    }

    async fn chat(&self, id: &str, turn: ChatTurn) -> CoreResult<ChatReply> {
        let mut data = self.lock().await;
        let agent = data
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found("agent", id))?;
        let reply = synthesize_reply(
            agent.profile_md.as_deref(),
            &turn.model,
            &turn.message,
            turn.max_tokens,
        );
        agent.chat_history.record_turn(
            ChatEntry::user(turn.message),
            ChatEntry::assistant(reply.clone()),
            turn.context_rounds,
        );
        debug!(agent_id = %id, history = agent.chat_history.len(), "chat turn recorded");
        Ok(ChatReply { role: ChatRole::Assistant, content: reply })
    }

    async fn chat_history(&self, id: &str, limit: i64) -> CoreResult<Vec<ChatEntry>> {
        let data = self.lock().await;
        let agent = data
            .agents
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::not_found("agent", id))?;
        Ok(agent.chat_history.recent(limit))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chat::window_len;
    use crate::entities::CreateSessionRequest;

    fn named(name: &str) -> CreateAgentRequest {
        CreateAgentRequest { name: Some(name.to_owned()), ..CreateAgentRequest::default() }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_newest_first() {
        let store = MemoryStore::default();
        let first = store.create_agent(named("A")).await.unwrap();
        let second = store.create_agent(named("B")).await.unwrap();

        assert_eq!(first.status, AgentStatus::Draft);
        assert_eq!(first.model, DEFAULT_MODEL);
        assert_eq!(first.id.len(), RESOURCE_ID_LEN);
        assert_eq!(first.session_id.len(), SESSION_ID_LEN);
        assert_ne!(first.id, second.id);

        let page = store.list_agents(&PageQuery::default()).await.unwrap();
        assert_eq!(page.items[0].id, second.id);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn create_rejects_missing_or_blank_name() {
        let store = MemoryStore::default();
        let err = store.create_agent(CreateAgentRequest::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let err = store.create_agent(named("   ")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn update_patches_and_rejects_empty_name() {
        let store = MemoryStore::default();
        let agent = store.create_agent(named("A")).await.unwrap();

        let updated = store
            .update_agent(
                &agent.id,
                UpdateAgentRequest { description: Some("desc".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "A");
        assert_eq!(updated.description, "desc");
        assert!(updated.updated_at >= agent.updated_at);

        let err = store
            .update_agent(&agent.id, UpdateAgentRequest { name: Some(String::new()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = store.update_agent("missing", UpdateAgentRequest::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn publish_unpublish_cycle() {
        let store = MemoryStore::default();
        let agent = store.create_agent(named("A")).await.unwrap();

        let err = store.unpublish_agent(&agent.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        assert_eq!(store.publish_agent(&agent.id).await.unwrap().status, AgentStatus::Published);
        assert_eq!(store.publish_agent(&agent.id).await.unwrap().status, AgentStatus::Published);
        assert_eq!(store.unpublish_agent(&agent.id).await.unwrap().status, AgentStatus::Draft);
    }

    #[tokio::test]
    async fn publish_clears_sessions() {
        let store = MemoryStore::default();
        let agent = store.create_agent(named("A")).await.unwrap();
        store.create_session(&agent.id, CreateSessionRequest::default()).await.unwrap();
        store.publish_agent(&agent.id).await.unwrap();
        assert!(store.list_sessions(&agent.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryStore::default();
        let agent = store.create_agent(named("A")).await.unwrap();
        store.create_session(&agent.id, CreateSessionRequest::default()).await.unwrap();

        assert_eq!(store.delete_agent(&agent.id).await.unwrap().id, agent.id);
        assert!(matches!(store.get_agent(&agent.id).await, Err(CoreError::NotFound(_))));
        assert!(matches!(store.delete_agent(&agent.id).await, Err(CoreError::NotFound(_))));
        assert!(matches!(store.list_sessions(&agent.id).await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn chat_bounds_history_window() {
        let store = MemoryStore::default();
        let agent = store.create_agent(named("A")).await.unwrap();
        for i in 0..6 {
            let turn = ChatTurn { message: format!("m{i}"), context_rounds: 2, ..ChatTurn::default() };
            let reply = store.chat(&agent.id, turn).await.unwrap();
            assert_eq!(reply.content, format!("Model({DEFAULT_MODEL}) reply: m{i}"));
        }
        let history = store.chat_history(&agent.id, 100).await.unwrap();
        assert_eq!(history.len(), window_len(2));
        assert_eq!(history[2], ChatEntry::user("m5"));
        assert_eq!(history[3].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn persona_marks_reply() {
        let store = MemoryStore::default();
        let agent = store
            .create_agent(CreateAgentRequest { profile_md: Some("# Persona".into()), ..named("P") })
            .await
            .unwrap();
        let reply = store
            .chat(&agent.id, ChatTurn { message: "hello".into(), max_tokens: 2, ..ChatTurn::default() })
            .await
            .unwrap();
        assert_eq!(reply.content, format!("[persona active] Model({DEFAULT_MODEL}) reply: he"));
    }

    #[tokio::test]
    async fn status_and_keyword_filters() {
        let store = MemoryStore::default();
        let a = store.create_agent(named("support bot")).await.unwrap();
        store.create_agent(named("sales bot")).await.unwrap();
        store.publish_agent(&a.id).await.unwrap();

        let published = store
            .list_agents(&PageQuery::default().with_status("published"))
            .await
            .unwrap();
        assert_eq!(published.total, 1);
        let bots = store.list_agents(&PageQuery::default().with_keyword("bot")).await.unwrap();
        assert_eq!(bots.total, 2);
    }
}
