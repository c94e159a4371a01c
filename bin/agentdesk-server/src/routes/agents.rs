//! Agent routes: CRUD, publishing, and simulated chat (JSON or SSE).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::Stream;
use tracing::debug;
use utoipa::OpenApi;

use agentdesk_core::chat::{ChatEntry, ChatRole, DEFAULT_HISTORY_LIMIT};
use agentdesk_core::entities::{
    Agent, AgentStatus, AgentStore, ChatReply, ChatRequest, CreateAgentRequest, Deleted, StatusChange,
    UpdateAgentRequest,
};
use agentdesk_core::stream::{StreamFrame, reply_frames};
use agentdesk_core::{Page, PageQuery};

use crate::error::ServerError;
use crate::extract::{ApiJson, ApiQuery, OptionalJson};
use crate::schemas::agent::HistoryQuery;
use crate::schemas::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_agents,
        create_agent,
        get_agent,
        update_agent,
        delete_agent,
        publish_agent,
        unpublish_agent,
        chat,
        chat_stream,
        chat_messages
    ),
    components(schemas(
        Agent,
        AgentStatus,
        CreateAgentRequest,
        UpdateAgentRequest,
        StatusChange,
        ChatRequest,
        ChatReply,
        ChatEntry,
        ChatRole,
        Deleted
    ))
)]
pub struct AgentsApi;

/// Register agent routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route("/agents/{id}", get(get_agent).put(update_agent).delete(delete_agent))
        .route("/agents/{id}/publish", post(publish_agent))
        .route("/agents/{id}/unpublish", post(unpublish_agent))
        .route("/agents/{id}/chat", post(chat))
        .route("/agents/{id}/chat/stream", post(chat_stream))
        .route("/agents/{id}/chat/messages", get(chat_messages))
}

#[utoipa::path(
    get,
    path = "/api/agents",
    tag = "agents",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of agents, newest first", body = ApiResponse<Page<Agent>>),
        (status = 400, description = "Invalid paging parameters"),
    )
)]
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<Agent>> {
    Ok(ApiResponse::ok(state.store.list_agents(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/agents",
    tag = "agents",
    request_body = CreateAgentRequest,
    responses(
        (status = 200, description = "Agent created as draft", body = ApiResponse<Agent>),
        (status = 400, description = "Missing name"),
    )
)]
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateAgentRequest>,
) -> ApiResult<Agent> {
    Ok(ApiResponse::ok(state.store.create_agent(req).await?))
}

#[utoipa::path(
    get,
    path = "/api/agents/{id}",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Agent found", body = ApiResponse<Agent>),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn get_agent(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Agent> {
    Ok(ApiResponse::ok(state.store.get_agent(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/agents/{id}",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    request_body = UpdateAgentRequest,
    responses(
        (status = 200, description = "Agent updated", body = ApiResponse<Agent>),
        (status = 400, description = "Empty name"),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateAgentRequest>,
) -> ApiResult<Agent> {
    Ok(ApiResponse::ok(state.store.update_agent(&id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/agents/{id}",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Agent and its sessions deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn delete_agent(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Deleted> {
    Ok(ApiResponse::ok(state.store.delete_agent(&id).await?))
}

#[utoipa::path(
    post,
    path = "/api/agents/{id}/publish",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Agent published", body = ApiResponse<StatusChange>),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn publish_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusChange> {
    Ok(ApiResponse::ok(state.store.publish_agent(&id).await?))
}

#[utoipa::path(
    post,
    path = "/api/agents/{id}/unpublish",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Agent back to draft", body = ApiResponse<StatusChange>),
        (status = 400, description = "Agent is not published"),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn unpublish_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusChange> {
    Ok(ApiResponse::ok(state.store.unpublish_agent(&id).await?))
}

/// Simulated chat turn.
///
/// Responds with Server-Sent Events when the client sends
/// `Accept: text/event-stream` or sets `stream: true`; otherwise with the
/// enveloped JSON reply.
#[utoipa::path(
    post,
    path = "/api/agents/{id}/chat",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ApiResponse<ChatReply>),
        (status = 200, description = "Streamed reply", content_type = "text/event-stream"),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    OptionalJson(req): OptionalJson<ChatRequest>,
) -> Result<Response, ServerError> {
    let wants_sse = req.wants_stream() || accepts_event_stream(&headers);
    let reply = state.store.chat(&id, req.into_turn()).await?;
    if wants_sse {
        return Ok(sse_reply(&state, &id, &reply.content).into_response());
    }
    Ok(ApiResponse::ok(reply).into_response())
}

#[utoipa::path(
    post,
    path = "/api/agents/{id}/chat/stream",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Streamed reply terminated by `data: [DONE]`", content_type = "text/event-stream"),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    OptionalJson(req): OptionalJson<ChatRequest>,
) -> Result<Response, ServerError> {
    let reply = state.store.chat(&id, req.into_turn()).await?;
    Ok(sse_reply(&state, &id, &reply.content).into_response())
}

#[utoipa::path(
    get,
    path = "/api/agents/{id}/chat/messages",
    tag = "agents",
    params(("id" = String, Path, description = "Agent id"), HistoryQuery),
    responses(
        (status = 200, description = "Most recent history entries, oldest first", body = ApiResponse<Vec<ChatEntry>>),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn chat_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Vec<ChatEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(ApiResponse::ok(state.store.chat_history(&id, limit).await?))
}

// ── SSE helpers ───────────────────────────────────────────────────────────────

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

fn sse_reply(
    state: &AppState,
    agent_id: &str,
    reply: &str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let frames = reply_frames(reply, state.config.stream_chunk_chars);
    debug!(agent_id, frames = frames.len(), "streaming chat reply");
    Sse::new(frame_stream(frames, state.config.stream_chunk_delay))
}

/// Emit `frames` in order, pausing `delay` between consecutive frames.
/// Dropping the stream (client disconnect) stops production.
fn frame_stream(
    frames: Vec<StreamFrame>,
    delay: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    futures::stream::unfold((frames.into_iter(), true), move |(mut frames, first)| async move {
        let frame = frames.next()?;
        if !first && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some((Ok(Event::default().data(frame.data())), (frames, false)))
    })
}
