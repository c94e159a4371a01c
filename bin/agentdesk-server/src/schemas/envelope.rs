//! Response envelope wrapped around every JSON payload under `/api`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SUCCESS_CODE: i32 = 0;
pub const SUCCESS_MESSAGE: &str = "success";

/// `{code, message, data, timestamp}`; `code` is 0 on success and the HTTP
/// status on failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: SUCCESS_MESSAGE.to_owned(),
            data,
            timestamp: agentdesk_core::entities::now_millis(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: i32::from(status.as_u16()),
            message: message.into(),
            data: (),
            timestamp: agentdesk_core::entities::now_millis(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Result type of every enveloped handler.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ServerError>;
