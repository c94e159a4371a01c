use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use agentdesk_core::CoreError;

use crate::error::ServerError;
use crate::state::AppState;

/// Reject requests whose bearer token does not match the configured secret.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let header = req.headers().get(AUTHORIZATION).map(|v| v.to_str());
    match header {
        Some(Err(_)) => return Err(CoreError::InvalidCredential.into()),
        Some(Ok(value)) => check_token(Some(value), &state.config.token)?,
        None => check_token(None, &state.config.token)?,
    }
    Ok(next.run(req).await)
}

/// Compare an `Authorization` header value against `expected`.
///
/// The `Bearer` scheme is optional and matched case-insensitively.
pub fn check_token(header: Option<&str>, expected: &str) -> Result<(), CoreError> {
    let token = header.map(strip_bearer).unwrap_or_default();
    if token.is_empty() {
        return Err(CoreError::Unauthenticated);
    }
    if token != expected {
        return Err(CoreError::InvalidCredential);
    }
    Ok(())
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &value[6..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim()
            } else {
                value
            }
        }
        _ => value,
    }
}
