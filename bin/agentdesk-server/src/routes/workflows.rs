use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;
use utoipa::OpenApi;

use agentdesk_core::entities::{
    CreateWorkflowRequest, Deleted, ExecuteWorkflowRequest, NodeResult, SaveWorkflowRequest,
    TriggerType, UpdateWorkflowRequest, Workflow, WorkflowExecution, WorkflowStatus, WorkflowStore,
};
use agentdesk_core::{Page, PageQuery};

use crate::extract::{ApiJson, ApiQuery};
use crate::schemas::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_workflows,
        create_workflow,
        get_workflow,
        update_workflow,
        delete_workflow,
        save_workflow,
        execute_workflow
    ),
    components(schemas(
        Workflow,
        WorkflowStatus,
        TriggerType,
        CreateWorkflowRequest,
        UpdateWorkflowRequest,
        SaveWorkflowRequest,
        ExecuteWorkflowRequest,
        NodeResult,
        WorkflowExecution
    ))
)]
pub struct WorkflowsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/workflows/{id}/save", post(save_workflow))
        .route("/workflows/{id}/execute", post(execute_workflow))
}

#[utoipa::path(
    get,
    path = "/api/workflows",
    tag = "workflows",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of workflows", body = ApiResponse<Page<Workflow>>),
        (status = 400, description = "Invalid paging parameters"),
    )
)]
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<Workflow>> {
    Ok(ApiResponse::ok(state.store.list_workflows(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/workflows",
    tag = "workflows",
    request_body = CreateWorkflowRequest,
    responses(
        (status = 200, description = "Workflow created", body = ApiResponse<Workflow>),
        (status = 400, description = "Missing name"),
    )
)]
pub async fn create_workflow(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateWorkflowRequest>,
) -> ApiResult<Workflow> {
    Ok(ApiResponse::ok(state.store.create_workflow(req).await?))
}

#[utoipa::path(
    get,
    path = "/api/workflows/{id}",
    tag = "workflows",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow found", body = ApiResponse<Workflow>),
        (status = 404, description = "Workflow not found"),
    )
)]
pub async fn get_workflow(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Workflow> {
    Ok(ApiResponse::ok(state.store.get_workflow(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/workflows/{id}",
    tag = "workflows",
    params(("id" = String, Path, description = "Workflow id")),
    request_body = UpdateWorkflowRequest,
    responses(
        (status = 200, description = "Workflow updated", body = ApiResponse<Workflow>),
        (status = 400, description = "Empty name"),
        (status = 404, description = "Workflow not found"),
    )
)]
pub async fn update_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateWorkflowRequest>,
) -> ApiResult<Workflow> {
    Ok(ApiResponse::ok(state.store.update_workflow(&id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/workflows/{id}",
    tag = "workflows",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Workflow not found"),
    )
)]
pub async fn delete_workflow(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Deleted> {
    Ok(ApiResponse::ok(state.store.delete_workflow(&id).await?))
}

/// Replace the agent chain.
///
/// Every id must name an existing published agent; the first offending id
/// is reported and the stored chain is left untouched.
#[utoipa::path(
    post,
    path = "/api/workflows/{id}/save",
    tag = "workflows",
    params(("id" = String, Path, description = "Workflow id")),
    request_body = SaveWorkflowRequest,
    responses(
        (status = 200, description = "Chain saved", body = ApiResponse<Workflow>),
        (status = 400, description = "agentIds missing, not a list, or naming an unusable agent"),
        (status = 404, description = "Workflow not found"),
    )
)]
pub async fn save_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SaveWorkflowRequest>,
) -> ApiResult<Workflow> {
    let workflow = state.store.save_workflow(&id, req).await?;
    info!(workflow_id = %workflow.id, agents = workflow.agent_ids.len(), "workflow chain saved");
    Ok(ApiResponse::ok(workflow))
}

#[utoipa::path(
    post,
    path = "/api/workflows/{id}/execute",
    tag = "workflows",
    params(("id" = String, Path, description = "Workflow id")),
    request_body = ExecuteWorkflowRequest,
    responses(
        (status = 200, description = "Per-step outputs and the final output", body = ApiResponse<WorkflowExecution>),
        (status = 400, description = "Blank input, empty chain, or an agent that is gone or unpublished"),
        (status = 404, description = "Workflow not found"),
    )
)]
pub async fn execute_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ExecuteWorkflowRequest>,
) -> ApiResult<WorkflowExecution> {
    Ok(ApiResponse::ok(state.store.execute_workflow(&id, req).await?))
}
