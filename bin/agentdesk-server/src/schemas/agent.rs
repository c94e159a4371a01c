use serde::Deserialize;
use utoipa::IntoParams;

/// Query of `GET /agents/{id}/chat/messages`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Number of most recent entries to return (default 100).
    pub limit: Option<i64>,
}
