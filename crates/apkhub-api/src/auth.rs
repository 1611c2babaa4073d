//! Service-key authentication for the management routes.
//!
//! The `/api/v0/*` routes require an `X-Api-Key` header matching the
//! configured service key. The download routes stay public; their gate is
//! the domain-lock protocol, not this key.

use crate::error::HttpAppError;
use crate::state::AppState;
use apkhub_core::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison. Length is not secret here; the early
/// return only leaks what the attacker already chose.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    let Some(provided) = provided else {
        tracing::debug!(path = %request.uri().path(), "Missing X-Api-Key header");
        return HttpAppError(AppError::Unauthorized(
            "Missing X-Api-Key header".to_string(),
        ))
        .into_response();
    };

    if !secure_compare(provided, &state.config.service_api_key) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return HttpAppError(AppError::Unauthorized("Invalid API key".to_string()))
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::secure_compare;

    #[test]
    fn test_secure_compare_equal() {
        assert!(secure_compare("abcdef", "abcdef"));
    }

    #[test]
    fn test_secure_compare_different_content() {
        assert!(!secure_compare("abcdef", "abcdeg"));
    }

    #[test]
    fn test_secure_compare_different_length() {
        assert!(!secure_compare("abc", "abcdef"));
        assert!(!secure_compare("", "abcdef"));
    }
}
