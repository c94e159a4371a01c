//! Plugin routes.
//!
//! A plugin moves through `untested → passed/failed` via `/plugins/test`;
//! only a passed plugin may be enabled, and only an enabled one published.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::Router;
use tracing::debug;
use utoipa::OpenApi;

use agentdesk_core::entities::{
    CreatePluginRequest, Deleted, Plugin, PluginStatus, PluginStore, PluginTestRequest,
    PluginTemplate, PluginTestResult, PluginTool, PublishStatus, TestStatus, UpdatePluginRequest,
};
use agentdesk_core::{CoreError, Page, PageQuery};

use crate::extract::{ApiJson, ApiQuery};
use crate::schemas::envelope::{ApiResponse, ApiResult};
use crate::schemas::plugin::{PluginImportForm, ToggleQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_plugins,
        create_plugin,
        get_plugin,
        update_plugin,
        delete_plugin,
        toggle_plugin,
        publish_plugin,
        test_plugin,
        import_template,
        list_published_names
    ),
    components(schemas(
        Plugin,
        PluginTool,
        PluginStatus,
        PublishStatus,
        TestStatus,
        CreatePluginRequest,
        UpdatePluginRequest,
        PluginTestRequest,
        PluginTestResult,
        PluginTemplate,
        PluginImportForm
    ))
)]
pub struct PluginsApi;

/// Register plugin routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plugins", get(list_plugins).post(create_plugin))
        .route("/plugins/test", post(test_plugin))
        .route("/plugins/import", post(import_template))
        .route("/plugins/getlist", get(list_published_names))
        .route(
            "/plugins/{id}",
            get(get_plugin).put(update_plugin).delete(delete_plugin),
        )
        .route("/plugins/{id}/toggle", post(toggle_plugin))
        .route("/plugins/{id}/publish", post(publish_plugin))
}

#[utoipa::path(
    get,
    path = "/api/plugins",
    tag = "plugins",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of plugins", body = ApiResponse<Page<Plugin>>),
        (status = 400, description = "Invalid paging parameters"),
    )
)]
pub async fn list_plugins(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<Plugin>> {
    Ok(ApiResponse::ok(state.store.list_plugins(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/plugins",
    tag = "plugins",
    request_body = CreatePluginRequest,
    responses(
        (status = 200, description = "Plugin created disabled and untested", body = ApiResponse<Plugin>),
        (status = 400, description = "Missing name"),
    )
)]
pub async fn create_plugin(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePluginRequest>,
) -> ApiResult<Plugin> {
    Ok(ApiResponse::ok(state.store.create_plugin(req).await?))
}

#[utoipa::path(
    get,
    path = "/api/plugins/{id}",
    tag = "plugins",
    params(("id" = String, Path, description = "Plugin id")),
    responses(
        (status = 200, description = "Plugin found", body = ApiResponse<Plugin>),
        (status = 404, description = "Plugin not found"),
    )
)]
pub async fn get_plugin(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Plugin> {
    Ok(ApiResponse::ok(state.store.get_plugin(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/plugins/{id}",
    tag = "plugins",
    params(("id" = String, Path, description = "Plugin id")),
    request_body = UpdatePluginRequest,
    responses(
        (status = 200, description = "Plugin updated", body = ApiResponse<Plugin>),
        (status = 400, description = "Empty name"),
        (status = 404, description = "Plugin not found"),
    )
)]
pub async fn update_plugin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePluginRequest>,
) -> ApiResult<Plugin> {
    Ok(ApiResponse::ok(state.store.update_plugin(&id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/plugins/{id}",
    tag = "plugins",
    params(("id" = String, Path, description = "Plugin id")),
    responses(
        (status = 200, description = "Plugin deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Plugin not found"),
    )
)]
pub async fn delete_plugin(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Deleted> {
    Ok(ApiResponse::ok(state.store.delete_plugin(&id).await?))
}

#[utoipa::path(
    post,
    path = "/api/plugins/{id}/toggle",
    tag = "plugins",
    params(("id" = String, Path, description = "Plugin id"), ToggleQuery),
    responses(
        (status = 200, description = "Plugin enabled or disabled", body = ApiResponse<Plugin>),
        (status = 400, description = "Enabling a plugin that has not passed a test"),
        (status = 404, description = "Plugin not found"),
    )
)]
pub async fn toggle_plugin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<ToggleQuery>,
) -> ApiResult<Plugin> {
    Ok(ApiResponse::ok(state.store.toggle_plugin(&id, query.enable).await?))
}

#[utoipa::path(
    post,
    path = "/api/plugins/{id}/publish",
    tag = "plugins",
    params(("id" = String, Path, description = "Plugin id")),
    responses(
        (status = 200, description = "Plugin published", body = ApiResponse<Plugin>),
        (status = 400, description = "Plugin is not enabled"),
        (status = 404, description = "Plugin not found"),
    )
)]
pub async fn publish_plugin(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Plugin> {
    Ok(ApiResponse::ok(state.store.publish_plugin(&id).await?))
}

/// Dry-run a plugin tool. Inputs are echoed back; no outbound call is made.
#[utoipa::path(
    post,
    path = "/api/plugins/test",
    tag = "plugins",
    request_body = PluginTestRequest,
    responses(
        (status = 200, description = "Test outcome", body = ApiResponse<PluginTestResult>),
        (status = 400, description = "Missing pluginId"),
        (status = 404, description = "Plugin not found"),
    )
)]
pub async fn test_plugin(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PluginTestRequest>,
) -> ApiResult<PluginTestResult> {
    Ok(ApiResponse::ok(state.store.test_plugin(req).await?))
}

/// Parse an uploaded plugin template. Nothing is stored; the client posts
/// the returned fields to `/plugins` to create the plugin.
#[utoipa::path(
    post,
    path = "/api/plugins/import",
    tag = "plugins",
    request_body(content = PluginImportForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Template fields", body = ApiResponse<PluginTemplate>),
        (status = 400, description = "Missing file or malformed template"),
    )
)]
pub async fn import_template(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<PluginTemplate> {
    let mut raw = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            raw = Some(field.bytes().await?);
        } else {
            debug!(field = field.name().unwrap_or_default(), "ignoring unknown multipart field");
        }
    }
    let raw = raw.ok_or_else(|| CoreError::Validation("file is required".to_owned()))?;
    Ok(ApiResponse::ok(state.store.import_template(&raw).await?))
}

#[utoipa::path(
    get,
    path = "/api/plugins/getlist",
    tag = "plugins",
    responses(
        (status = 200, description = "Names of published plugins", body = ApiResponse<Vec<String>>),
    )
)]
pub async fn list_published_names(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(state.store.list_published_names().await?))
}
