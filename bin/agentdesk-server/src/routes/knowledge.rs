//! Knowledge-base routes: base CRUD, document upload/list/delete, and search.
//!
//! Uploads are `multipart/form-data`. Only the file name and byte length are
//! kept; the content is streamed and counted, never buffered whole. The body
//! cap comes from `AGENTDESK_MAX_UPLOAD_MB`.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::Router;
use tracing::debug;
use utoipa::OpenApi;

use agentdesk_core::entities::{
    CreateKnowledgeBaseRequest, Deleted, Document, DocumentStatus, DocumentUpload, KnowledgeBase,
    KnowledgeStore, SearchHit, SearchRequest, SearchResponse, UpdateKnowledgeBaseRequest,
};
use agentdesk_core::{CoreError, Page, PageQuery};

use crate::error::ServerError;
use crate::extract::{ApiJson, ApiQuery};
use crate::schemas::envelope::{ApiResponse, ApiResult};
use crate::schemas::knowledge::DocumentUploadForm;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_knowledge_bases,
        create_knowledge_base,
        get_knowledge_base,
        update_knowledge_base,
        delete_knowledge_base,
        list_documents,
        upload_document,
        delete_document,
        search
    ),
    components(schemas(
        KnowledgeBase,
        CreateKnowledgeBaseRequest,
        UpdateKnowledgeBaseRequest,
        Document,
        DocumentStatus,
        DocumentUploadForm,
        SearchRequest,
        SearchHit,
        SearchResponse
    ))
)]
pub struct KnowledgeApi;

/// Register knowledge-base routes.
pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/knowledge-bases",
            get(list_knowledge_bases).post(create_knowledge_base),
        )
        .route(
            "/knowledge-bases/{id}",
            get(get_knowledge_base)
                .put(update_knowledge_base)
                .delete(delete_knowledge_base),
        )
        .route(
            "/knowledge-bases/{id}/documents",
            // The limit layer wraps only the upload handler.
            post(upload_document)
                .layer(DefaultBodyLimit::max(max_upload_bytes))
                .get(list_documents),
        )
        .route("/knowledge-bases/{id}/documents/{doc_id}", delete(delete_document))
        .route("/knowledge-bases/{id}/search", post(search))
}

/// `status` filters on `enabled` / `disabled`.
#[utoipa::path(
    get,
    path = "/api/knowledge-bases",
    tag = "knowledge",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of knowledge bases", body = ApiResponse<Page<KnowledgeBase>>),
        (status = 400, description = "Invalid paging parameters"),
    )
)]
pub async fn list_knowledge_bases(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<KnowledgeBase>> {
    Ok(ApiResponse::ok(state.store.list_knowledge_bases(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/knowledge-bases",
    tag = "knowledge",
    request_body = CreateKnowledgeBaseRequest,
    responses(
        (status = 200, description = "Knowledge base created", body = ApiResponse<KnowledgeBase>),
        (status = 400, description = "Missing name"),
    )
)]
pub async fn create_knowledge_base(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateKnowledgeBaseRequest>,
) -> ApiResult<KnowledgeBase> {
    Ok(ApiResponse::ok(state.store.create_knowledge_base(req).await?))
}

#[utoipa::path(
    get,
    path = "/api/knowledge-bases/{id}",
    tag = "knowledge",
    params(("id" = String, Path, description = "Knowledge base id")),
    responses(
        (status = 200, description = "Knowledge base found", body = ApiResponse<KnowledgeBase>),
        (status = 404, description = "Knowledge base not found"),
    )
)]
pub async fn get_knowledge_base(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<KnowledgeBase> {
    Ok(ApiResponse::ok(state.store.get_knowledge_base(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/knowledge-bases/{id}",
    tag = "knowledge",
    params(("id" = String, Path, description = "Knowledge base id")),
    request_body = UpdateKnowledgeBaseRequest,
    responses(
        (status = 200, description = "Knowledge base updated", body = ApiResponse<KnowledgeBase>),
        (status = 400, description = "Empty name"),
        (status = 404, description = "Knowledge base not found"),
    )
)]
pub async fn update_knowledge_base(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateKnowledgeBaseRequest>,
) -> ApiResult<KnowledgeBase> {
    Ok(ApiResponse::ok(state.store.update_knowledge_base(&id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/knowledge-bases/{id}",
    tag = "knowledge",
    params(("id" = String, Path, description = "Knowledge base id")),
    responses(
        (status = 200, description = "Knowledge base and its documents deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Knowledge base not found"),
    )
)]
pub async fn delete_knowledge_base(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    Ok(ApiResponse::ok(state.store.delete_knowledge_base(&id).await?))
}

#[utoipa::path(
    get,
    path = "/api/knowledge-bases/{id}/documents",
    tag = "knowledge",
    params(("id" = String, Path, description = "Knowledge base id"), PageQuery),
    responses(
        (status = 200, description = "One page of documents", body = ApiResponse<Page<Document>>),
        (status = 404, description = "Knowledge base not found"),
    )
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Page<Document>> {
    Ok(ApiResponse::ok(state.store.list_documents(&id, &query).await?))
}

/// Register an uploaded file as a `pending` document.
///
/// Processing completes in the background after the configured delay.
#[utoipa::path(
    post,
    path = "/api/knowledge-bases/{id}/documents",
    tag = "knowledge",
    params(("id" = String, Path, description = "Knowledge base id")),
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document accepted", body = ApiResponse<Document>),
        (status = 400, description = "Missing or empty file, or invalid chunk size"),
        (status = 404, description = "Knowledge base not found"),
        (status = 413, description = "Upload exceeds the configured size limit"),
    )
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Document> {
    let upload = read_upload(multipart).await?;
    debug!(kb_id = %id, name = %upload.name, size = upload.size, "received document upload");
    Ok(ApiResponse::ok(state.store.upload_document(&id, upload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/knowledge-bases/{id}/documents/{doc_id}",
    tag = "knowledge",
    params(
        ("id" = String, Path, description = "Knowledge base id"),
        ("doc_id" = String, Path, description = "Document id"),
    ),
    responses(
        (status = 200, description = "Document deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Knowledge base or document not found"),
    )
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path((id, doc_id)): Path<(String, String)>,
) -> ApiResult<Deleted> {
    Ok(ApiResponse::ok(state.store.delete_document(&id, &doc_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/knowledge-bases/{id}/search",
    tag = "knowledge",
    params(("id" = String, Path, description = "Knowledge base id")),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Hits by descending score", body = ApiResponse<SearchResponse>),
        (status = 400, description = "Blank query, topK < 1, or threshold outside [0, 1]"),
        (status = 404, description = "Knowledge base not found"),
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SearchRequest>,
) -> ApiResult<SearchResponse> {
    Ok(ApiResponse::ok(state.store.search(&id, req).await?))
}

async fn read_upload(mut multipart: Multipart) -> Result<DocumentUpload, ServerError> {
    let mut file: Option<(String, u64)> = None;
    let mut split_method = None;
    let mut chunk_size = None;

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("upload").to_owned();
                let mut size = 0u64;
                while let Some(chunk) = field.chunk().await? {
                    size += chunk.len() as u64;
                }
                file = Some((name, size));
            }
            "splitMethod" => {
                let value = field.text().await?;
                let value = value.trim();
                if !value.is_empty() {
                    split_method = Some(value.to_owned());
                }
            }
            "chunkSize" => {
                let value = field.text().await?;
                let parsed = value.trim().parse::<i64>().map_err(|_| {
                    ServerError::BadRequest(format!("chunkSize must be an integer (got {value:?})"))
                })?;
                chunk_size = Some(parsed);
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let (name, size) = file.ok_or_else(|| CoreError::Validation("file is required".to_owned()))?;
    Ok(DocumentUpload {
        name,
        size,
        split_method,
        chunk_size,
    })
}
