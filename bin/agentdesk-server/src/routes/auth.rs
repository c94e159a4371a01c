//! Login and the signed-in user's profile and menus.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;
use utoipa::OpenApi;

use agentdesk_core::entities::{MenuItem, ProfileStore, UpdateProfileRequest, UserProfile};

use crate::extract::ApiJson;
use crate::schemas::auth::{LoginRequest, LoginResponse, ProfileDeleted};
use crate::schemas::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(login, get_profile, update_profile, delete_profile, list_menus),
    components(schemas(LoginRequest, LoginResponse, UserProfile, UpdateProfileRequest, ProfileDeleted, MenuItem))
)]
pub struct AuthApi;

/// `POST /auth/login`; never gated.
pub fn login_router() -> Router<Arc<AppState>> {
    Router::new().route("/auth/login", post(login))
}

/// Profile and menu routes; the caller layers the token gate on top.
pub fn profile_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/v1/user/profile",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/menus", get(list_menus))
        .route("/v1/menus", get(list_menus))
}

/// Issue the shared token for the named user.
///
/// The password is never checked and unknown usernames resolve to the
/// default user.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Malformed body"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = state.store.login(req.username.as_deref()).await?;
    info!(user_id = user.user_id, username = %user.username, "user logged in");
    Ok(ApiResponse::ok(LoginResponse::new(&user, &state.config.token)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/profile",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn get_profile(State(state): State<Arc<AppState>>) -> ApiResult<UserProfile> {
    Ok(ApiResponse::ok(state.store.profile().await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/profile",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    Ok(ApiResponse::ok(state.store.update_profile(req).await?))
}

/// Acknowledges the request; the single user record is kept.
#[utoipa::path(
    delete,
    path = "/api/v1/user/profile",
    tag = "auth",
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<ProfileDeleted>),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn delete_profile() -> ApiResult<ProfileDeleted> {
    Ok(ApiResponse::ok(ProfileDeleted { deleted: true }))
}

#[utoipa::path(
    get,
    path = "/api/menus",
    tag = "auth",
    responses(
        (status = 200, description = "Navigation menu, by sort order", body = ApiResponse<Vec<MenuItem>>),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn list_menus(State(state): State<Arc<AppState>>) -> ApiResult<Vec<MenuItem>> {
    Ok(ApiResponse::ok(state.store.menus().await?))
}
