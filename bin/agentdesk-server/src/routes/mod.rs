//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `AGENTDESK_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - `/api` resource routes, with the bearer-token gate applied per group

mod agents;
mod auth;
pub mod doc;
mod health;
mod knowledge;
mod plugins;
mod sessions;
mod workflows;

use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::require_token;
use crate::middleware::{cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", api_router(&state));

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

/// Routes nested under `/api`.
///
/// Login is open; profile, menus and sessions always need the token;
/// resource groups need it only when `guard_resources` is set.
fn api_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let gated = Router::new()
        .merge(auth::profile_router())
        .merge(sessions::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let mut resources = Router::new()
        .merge(agents::router())
        .merge(knowledge::router(state.config.max_upload_bytes))
        .merge(workflows::router())
        .merge(plugins::router());
    if state.config.guard_resources {
        resources = resources.route_layer(middleware::from_fn_with_state(state.clone(), require_token));
    }

    Router::new()
        .merge(auth::login_router())
        .merge(gated)
        .merge(resources)
}

#[derive(OpenApi)]
#[openapi()]
pub struct ResourceApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = ResourceApi::openapi();
    spec.merge(health::HealthApi::openapi());
    spec.merge(auth::AuthApi::openapi());
    spec.merge(agents::AgentsApi::openapi());
    spec.merge(sessions::SessionsApi::openapi());
    spec.merge(knowledge::KnowledgeApi::openapi());
    spec.merge(workflows::WorkflowsApi::openapi());
    spec.merge(plugins::PluginsApi::openapi());
    spec
}

#[cfg(test)]
mod test;
