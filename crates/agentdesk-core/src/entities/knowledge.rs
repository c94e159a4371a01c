//! Knowledge bases, their documents, and placeholder retrieval.
//!
//! A knowledge base's `documentCount`, `chunkCount` and `totalSize` are
//! derived: they are recomputed from the current documents after every
//! document mutation, under the same store lock as the mutation itself.
//!
//! Uploading a document schedules a deferred processing task keyed by the
//! document id. The task moves the document through `processing` to
//! `processed`; deleting the document (or its knowledge base) aborts it.

use std::future::Future;

use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{Deleted, non_blank, not_blank, now_millis};
use crate::error::{CoreError, CoreResult};
use crate::ids::RESOURCE_ID_LEN;
use crate::pagination::{Listable, Page, PageQuery, paginate};
use crate::store::{Collections, MemoryStore};

pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_SPLIT_METHOD: &str = "fixed";
pub const DEFAULT_CHUNK_SIZE: i64 = 500;
pub const DEFAULT_TOP_K: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub enabled: bool,
    pub document_count: usize,
    pub chunk_count: u64,
    /// Sum of document sizes in bytes.
    pub total_size: u64,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl KnowledgeBase {
    fn recompute(&mut self, documents: &[Document]) {
        self.document_count = documents.len();
        self.chunk_count = documents.iter().map(|d| d.chunk_count).sum();
        self.total_size = documents.iter().map(|d| d.size).sum();
        self.updated_at = now_millis();
    }
}

impl Listable for KnowledgeBase {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.description.as_str(),
            self.category.as_str(),
        ]
    }

    fn status_str(&self) -> Option<&str> {
        Some(if self.enabled { "enabled" } else { "disabled" })
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Processing,
    Processed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub knowledge_base_id: String,
    pub name: String,
    pub size: u64,
    pub chunk_count: u64,
    pub status: DocumentStatus,
    pub uploaded_at: i64,
    pub split_method: String,
    pub chunk_size: u64,
}

impl Listable for Document {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn status_str(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateKnowledgeBaseRequest {
    #[validate(required(message = "is required"), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    /// Defaults to `general`.
    pub category: Option<String>,
    /// Defaults to `true`.
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKnowledgeBaseRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub enabled: Option<bool>,
}

/// A received file, already reduced to what the store keeps.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpload {
    pub name: String,
    pub size: u64,
    pub split_method: Option<String>,
    pub chunk_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// Defaults to 5.
    pub top_k: Option<i64>,
    /// Minimum score in `[0, 1]`; defaults to 0.
    pub similarity_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub source: String,
    pub score: f64,
    pub chunk_index: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total: usize,
}

pub trait KnowledgeStore: Send + Sync + 'static {
    fn list_knowledge_bases(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = CoreResult<Page<KnowledgeBase>>> + Send;
    fn create_knowledge_base(
        &self,
        req: CreateKnowledgeBaseRequest,
    ) -> impl Future<Output = CoreResult<KnowledgeBase>> + Send;
    fn get_knowledge_base(&self, id: &str) -> impl Future<Output = CoreResult<KnowledgeBase>> + Send;
    fn update_knowledge_base(
        &self,
        id: &str,
        req: UpdateKnowledgeBaseRequest,
    ) -> impl Future<Output = CoreResult<KnowledgeBase>> + Send;
    /// Removes the knowledge base, all of its documents, and their pending
    /// processing tasks.
    fn delete_knowledge_base(&self, id: &str) -> impl Future<Output = CoreResult<Deleted>> + Send;
    fn list_documents(
        &self,
        kb_id: &str,
        query: &PageQuery,
    ) -> impl Future<Output = CoreResult<Page<Document>>> + Send;
    fn upload_document(
        &self,
        kb_id: &str,
        upload: DocumentUpload,
    ) -> impl Future<Output = CoreResult<Document>> + Send;
    fn delete_document(
        &self,
        kb_id: &str,
        doc_id: &str,
    ) -> impl Future<Output = CoreResult<Deleted>> + Send;
    fn search(
        &self,
        kb_id: &str,
        req: SearchRequest,
    ) -> impl Future<Output = CoreResult<SearchResponse>> + Send;
}

/// `ceil(size / chunk_size)`; never zero for a non-empty file.
pub fn chunk_count(size: u64, chunk_size: u64) -> u64 {
    size.div_ceil(chunk_size.max(1)).max(1)
}

fn find_kb<'a>(data: &'a mut Collections, id: &str) -> CoreResult<&'a mut KnowledgeBase> {
    data.knowledge_bases
        .iter_mut()
        .find(|kb| kb.id == id)
        .ok_or_else(|| CoreError::not_found("knowledge base", id))
}

fn set_document_status(data: &mut Collections, kb_id: &str, doc_id: &str, status: DocumentStatus) -> bool {
    let Some(doc) = data
        .documents
        .get_mut(kb_id)
        .and_then(|docs| docs.iter_mut().find(|d| d.id == doc_id))
    else {
        return false;
    };
    doc.status = status;
    true
}

fn synthetic_hits(documents: &[Document], query: &str) -> Vec<SearchHit> {
    let mut rng = rand::thread_rng();
    documents
        .iter()
        .map(|doc| {
            let score: f64 = rng.gen_range(0.5..1.0);
            let chunk_index = rng.gen_range(0..doc.chunk_count.max(1));
            SearchHit {
                id: format!("{}-{chunk_index}", doc.id),
                content: format!("Excerpt from {} matching \"{query}\"", doc.name),
                source: doc.name.clone(),
                score: (score * 10_000.0).floor() / 10_000.0,
                chunk_index,
            }
        })
        .collect()
}

impl MemoryStore {
    /// Body of the deferred processing task for one document.
    async fn process_document(&self, kb_id: String, doc_id: String) {
        {
            let mut data = self.lock().await;
            if !set_document_status(&mut data, &kb_id, &doc_id, DocumentStatus::Processing) {
                self.tasks().remove(&doc_id);
                return;
            }
        }
        debug!(doc_id = %doc_id, "document processing started");
        tokio::time::sleep(self.settings().processing_delay).await;

        let mut guard = self.lock().await;
        let data = &mut *guard;
        if set_document_status(data, &kb_id, &doc_id, DocumentStatus::Processed) {
            let docs = data.documents.get(&kb_id).map(Vec::as_slice).unwrap_or_default();
            if let Some(kb) = data.knowledge_bases.iter_mut().find(|kb| kb.id == kb_id) {
                kb.recompute(docs);
            }
            debug!(doc_id = %doc_id, "document processed");
        }
        self.tasks().remove(&doc_id);
    }
}

impl KnowledgeStore for MemoryStore {
    async fn list_knowledge_bases(&self, query: &PageQuery) -> CoreResult<Page<KnowledgeBase>> {
        let data = self.lock().await;
        paginate(&data.knowledge_bases, query)
    }

    async fn create_knowledge_base(&self, req: CreateKnowledgeBaseRequest) -> CoreResult<KnowledgeBase> {
        req.validate()?;
        let mut data = self.lock().await;
        let now = now_millis();
        let kb = KnowledgeBase {
            id: data.knowledge_base_ids.issue(RESOURCE_ID_LEN),
            name: req.name.unwrap_or_default().trim().to_owned(),
            description: req.description.unwrap_or_default(),
            category: non_blank(req.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
            enabled: req.enabled.unwrap_or(true),
            document_count: 0,
            chunk_count: 0,
            total_size: 0,
            created_by: self.settings().default_owner.clone(),
            created_at: now,
            updated_at: now,
        };
        data.knowledge_bases.insert(0, kb.clone());
        data.documents.insert(kb.id.clone(), Vec::new());
        info!(kb_id = %kb.id, name = %kb.name, "knowledge base created");
        Ok(kb)
    }

    async fn get_knowledge_base(&self, id: &str) -> CoreResult<KnowledgeBase> {
        let data = self.lock().await;
        data.knowledge_bases
            .iter()
            .find(|kb| kb.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("knowledge base", id))
    }

    async fn update_knowledge_base(
        &self,
        id: &str,
        req: UpdateKnowledgeBaseRequest,
    ) -> CoreResult<KnowledgeBase> {
        req.validate()?;
        let mut data = self.lock().await;
        let kb = find_kb(&mut data, id)?;
        if let Some(name) = req.name {
            kb.name = name.trim().to_owned();
        }
        if let Some(description) = req.description {
            kb.description = description;
        }
        if let Some(category) = non_blank(req.category) {
            kb.category = category;
        }
        if let Some(enabled) = req.enabled {
            kb.enabled = enabled;
        }
        kb.updated_at = now_millis();
        Ok(kb.clone())
    }

    async fn delete_knowledge_base(&self, id: &str) -> CoreResult<Deleted> {
        let mut data = self.lock().await;
        let pos = data
            .knowledge_bases
            .iter()
            .position(|kb| kb.id == id)
            .ok_or_else(|| CoreError::not_found("knowledge base", id))?;
        let removed = data.knowledge_bases.remove(pos);
        let documents = data.documents.remove(id).unwrap_or_default();
        for doc in &documents {
            self.tasks().cancel(&doc.id);
        }
        info!(kb_id = %id, documents = documents.len(), "knowledge base deleted");
        Ok(Deleted { id: removed.id })
    }

    async fn list_documents(&self, kb_id: &str, query: &PageQuery) -> CoreResult<Page<Document>> {
        let data = self.lock().await;
        let docs = data
            .documents
            .get(kb_id)
            .ok_or_else(|| CoreError::not_found("knowledge base", kb_id))?;
        paginate(docs, query)
    }

    async fn upload_document(&self, kb_id: &str, upload: DocumentUpload) -> CoreResult<Document> {
        if upload.size == 0 {
            return Err(CoreError::Validation("file is empty".to_owned()));
        }
        let chunk_size = upload.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size < 1 {
            return Err(CoreError::Validation(format!(
                "chunkSize must be at least 1 (got {chunk_size})"
            )));
        }
        let chunk_size = chunk_size as u64;

        let mut guard = self.lock().await;
        let data = &mut *guard;
        if !data.knowledge_bases.iter().any(|kb| kb.id == kb_id) {
            return Err(CoreError::not_found("knowledge base", kb_id));
        }
        let name = non_blank(Some(upload.name)).unwrap_or_else(|| "untitled".to_owned());
        let doc = Document {
            id: data.document_ids.issue(RESOURCE_ID_LEN),
            knowledge_base_id: kb_id.to_owned(),
            name,
            size: upload.size,
            chunk_count: chunk_count(upload.size, chunk_size),
            status: DocumentStatus::Pending,
            uploaded_at: now_millis(),
            split_method: non_blank(upload.split_method)
                .unwrap_or_else(|| DEFAULT_SPLIT_METHOD.to_owned()),
            chunk_size,
        };
        let docs = data.documents.entry(kb_id.to_owned()).or_default();
        docs.push(doc.clone());
        if let Some(kb) = data.knowledge_bases.iter_mut().find(|kb| kb.id == kb_id) {
            kb.recompute(docs);
        }

        let store = self.clone();
        let (task_kb, task_doc) = (kb_id.to_owned(), doc.id.clone());
        let handle = tokio::spawn(async move { store.process_document(task_kb, task_doc).await });
        self.tasks().insert(doc.id.clone(), handle.abort_handle());

        info!(kb_id, doc_id = %doc.id, size = doc.size, chunks = doc.chunk_count, "document uploaded");
        Ok(doc)
    }

    async fn delete_document(&self, kb_id: &str, doc_id: &str) -> CoreResult<Deleted> {
        let mut guard = self.lock().await;
        let data = &mut *guard;
        let docs = data
            .documents
            .get_mut(kb_id)
            .ok_or_else(|| CoreError::not_found("knowledge base", kb_id))?;
        let pos = docs
            .iter()
            .position(|d| d.id == doc_id)
            .ok_or_else(|| CoreError::not_found("document", doc_id))?;
        let removed = docs.remove(pos);
        self.tasks().cancel(&removed.id);
        if let Some(kb) = data.knowledge_bases.iter_mut().find(|kb| kb.id == kb_id) {
            kb.recompute(docs);
        }
        debug!(kb_id, doc_id, "document deleted");
        Ok(Deleted { id: removed.id })
    }

    async fn search(&self, kb_id: &str, req: SearchRequest) -> CoreResult<SearchResponse> {
        let query = req.query.trim().to_owned();
        if query.is_empty() {
            return Err(CoreError::Validation("query must not be empty".to_owned()));
        }
        let top_k = req.top_k.unwrap_or(DEFAULT_TOP_K);
        if top_k < 1 {
            return Err(CoreError::Validation(format!("topK must be at least 1 (got {top_k})")));
        }
        let threshold = req.similarity_threshold.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoreError::Validation(format!(
                "similarityThreshold must be between 0 and 1 (got {threshold})"
            )));
        }

        let data = self.lock().await;
        let docs = data
            .documents
            .get(kb_id)
            .ok_or_else(|| CoreError::not_found("knowledge base", kb_id))?;
        let mut results: Vec<SearchHit> = synthetic_hits(docs, &query)
            .into_iter()
            .filter(|hit| hit.score >= threshold)
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k as usize);
        Ok(SearchResponse { query, total: results.len(), results })
    }
}
