use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query of `POST /plugins/{id}/toggle`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ToggleQuery {
    pub enable: bool,
}

/// Multipart form of `POST /plugins/import`.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct PluginImportForm {
    /// OpenAPI document or plain `{name, version, tools}` JSON.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
