use serde::Deserialize;
use utoipa::ToSchema;

/// Multipart form of `POST /knowledge-bases/{id}/documents`. Used for the
/// OpenAPI document; the handler reads the fields one by one.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Defaults to `fixed`.
    pub split_method: Option<String>,
    /// Defaults to 500.
    pub chunk_size: Option<i64>,
}
