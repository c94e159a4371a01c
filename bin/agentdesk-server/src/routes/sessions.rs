use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Router;
use utoipa::OpenApi;

use agentdesk_core::entities::{
    CreateSessionRequest, Deleted, RenameSessionRequest, Session, SessionStore,
};

use crate::extract::{ApiJson, OptionalJson};
use crate::schemas::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_sessions, create_session, rename_session, delete_session),
    components(schemas(Session, CreateSessionRequest, RenameSessionRequest))
)]
pub struct SessionsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents/{id}/sessions", get(list_sessions).post(create_session))
        .route(
            "/agents/{id}/sessions/{sid}",
            put(rename_session).delete(delete_session),
        )
}

#[utoipa::path(
    get,
    path = "/api/agents/{id}/sessions",
    tag = "sessions",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, description = "Sessions in creation order", body = ApiResponse<Vec<Session>>),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Session>> {
    Ok(ApiResponse::ok(state.store.list_sessions(&id).await?))
}

/// The body is optional; an empty request creates `New session`.
#[utoipa::path(
    post,
    path = "/api/agents/{id}/sessions",
    tag = "sessions",
    params(("id" = String, Path, description = "Agent id")),
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = ApiResponse<Session>),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Agent not found"),
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    OptionalJson(req): OptionalJson<CreateSessionRequest>,
) -> ApiResult<Session> {
    Ok(ApiResponse::ok(state.store.create_session(&id, req).await?))
}

#[utoipa::path(
    put,
    path = "/api/agents/{id}/sessions/{sid}",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "Agent id"),
        ("sid" = String, Path, description = "Session id"),
    ),
    request_body = RenameSessionRequest,
    responses(
        (status = 200, description = "Session renamed", body = ApiResponse<Session>),
        (status = 400, description = "Empty name"),
        (status = 404, description = "Agent or session not found"),
    )
)]
pub async fn rename_session(
    State(state): State<Arc<AppState>>,
    Path((id, sid)): Path<(String, String)>,
    ApiJson(req): ApiJson<RenameSessionRequest>,
) -> ApiResult<Session> {
    Ok(ApiResponse::ok(state.store.rename_session(&id, &sid, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/agents/{id}/sessions/{sid}",
    tag = "sessions",
    params(
        ("id" = String, Path, description = "Agent id"),
        ("sid" = String, Path, description = "Session id"),
    ),
    responses(
        (status = 200, description = "Session deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Agent or session not found"),
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path((id, sid)): Path<(String, String)>,
) -> ApiResult<Deleted> {
    Ok(ApiResponse::ok(state.store.delete_session(&id, &sid).await?))
}
