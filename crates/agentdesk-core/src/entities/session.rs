use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{Deleted, non_blank, not_blank, now_millis};
use crate::error::{CoreError, CoreResult};
use crate::ids::RESOURCE_ID_LEN;
use crate::store::{Collections, MemoryStore};

pub const DEFAULT_SESSION_NAME: &str = "New session";

/// A named conversation handle owned by one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub agent_id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RenameSessionRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
}

pub trait SessionStore: Send + Sync + 'static {
    fn list_sessions(&self, agent_id: &str) -> impl Future<Output = CoreResult<Vec<Session>>> + Send;
    fn create_session(
        &self,
        agent_id: &str,
        req: CreateSessionRequest,
    ) -> impl Future<Output = CoreResult<Session>> + Send;
    fn rename_session(
        &self,
        agent_id: &str,
        session_id: &str,
        req: RenameSessionRequest,
    ) -> impl Future<Output = CoreResult<Session>> + Send;
    fn delete_session(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> impl Future<Output = CoreResult<Deleted>> + Send;
    /// Drop every session of an agent; returns how many were removed.
    fn clear_sessions(&self, agent_id: &str) -> impl Future<Output = CoreResult<usize>> + Send;
}

fn ensure_agent(data: &Collections, agent_id: &str) -> CoreResult<()> {
    if data.agents.iter().any(|a| a.id == agent_id) {
        Ok(())
    } else {
        Err(CoreError::not_found("agent", agent_id))
    }
}

impl SessionStore for MemoryStore {
    async fn list_sessions(&self, agent_id: &str) -> CoreResult<Vec<Session>> {
        let data = self.lock().await;
        ensure_agent(&data, agent_id)?;
        Ok(data.sessions.get(agent_id).cloned().unwrap_or_default())
    }

    async fn create_session(&self, agent_id: &str, req: CreateSessionRequest) -> CoreResult<Session> {
        let mut data = self.lock().await;
        ensure_agent(&data, agent_id)?;
        let now = now_millis();
        let session = Session {
            id: data.session_ids.issue(RESOURCE_ID_LEN),
            agent_id: agent_id.to_owned(),
            name: non_blank(req.name).unwrap_or_else(|| DEFAULT_SESSION_NAME.to_owned()),
            created_at: now,
            updated_at: now,
        };
        data.sessions
            .entry(agent_id.to_owned())
            .or_default()
            .push(session.clone());
        debug!(agent_id, session_id = %session.id, "session created");
        Ok(session)
    }

    async fn rename_session(
        &self,
        agent_id: &str,
        session_id: &str,
        req: RenameSessionRequest,
    ) -> CoreResult<Session> {
        req.validate()?;
        let mut data = self.lock().await;
        ensure_agent(&data, agent_id)?;
        let session = data
            .sessions
            .get_mut(agent_id)
            .and_then(|list| list.iter_mut().find(|s| s.id == session_id))
            .ok_or_else(|| CoreError::not_found("session", session_id))?;
        session.name = req.name.trim().to_owned();
        session.updated_at = now_millis();
        Ok(session.clone())
    }

    async fn delete_session(&self, agent_id: &str, session_id: &str) -> CoreResult<Deleted> {
        let mut data = self.lock().await;
        ensure_agent(&data, agent_id)?;
        let list = data
            .sessions
            .get_mut(agent_id)
            .ok_or_else(|| CoreError::not_found("session", session_id))?;
        let pos = list
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| CoreError::not_found("session", session_id))?;
        let removed = list.remove(pos);
        debug!(agent_id, session_id, "session deleted");
        Ok(Deleted { id: removed.id })
    }

    async fn clear_sessions(&self, agent_id: &str) -> CoreResult<usize> {
        let mut data = self.lock().await;
        ensure_agent(&data, agent_id)?;
        Ok(data.sessions.remove(agent_id).map(|s| s.len()).unwrap_or(0))
    }
}
