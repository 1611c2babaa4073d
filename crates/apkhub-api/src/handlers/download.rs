//! Public download routes.
//!
//! `GET /d/{file_id}` is the shareable link. For an unlocked file it streams
//! the APK directly; for a locked file it renders the verification page,
//! issuing a speculative grant in the process. `GET /d/{file_id}/download`
//! is the gated endpoint the page redirects to, and the only authoritative
//! gate: the token is validated and consumed before any bytes leave storage.

use crate::domain_lock::{resolver, verify_page, GateDecision};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use apkhub_core::models::ApkFile;
use apkhub_core::AppError;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Query parameters of the gated download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub token: Option<String>,
    /// Advisory expiry hint embedded in the page's redirect URL. Logged for
    /// diagnostics, never trusted: the grant store keeps the real deadline.
    pub t: Option<String>,
}

/// A malformed id cannot name any file, so it gets the same answer as an
/// unknown one.
fn parse_file_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("File not found".to_string()))
}

async fn fetch_active_file(state: &AppState, file_id: Uuid) -> Result<ApkFile, AppError> {
    state
        .repo
        .get_if_active(file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))
}

#[utoipa::path(
    get,
    path = "/d/{file_id}",
    tag = "download",
    params(
        ("file_id" = Uuid, Path, description = "APK file ID")
    ),
    responses(
        (status = 200, description = "APK bytes (unlocked) or verification page (locked)"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "share_link"))]
pub async fn share_link(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Response, HttpAppError> {
    let file_id = parse_file_id(&file_id)?;
    let file = fetch_active_file(&state, file_id).await?;

    let Some(allowed_domain) = file.domain_lock() else {
        tracing::debug!(file_id = %file_id, "Unlocked file, streaming directly");
        return stream_file(&state, &file).await;
    };

    // One grant per render. Most never get consumed; the sweep inside
    // issue() keeps the store bounded.
    let grant = state.grants.issue(file_id, allowed_domain).await;
    let page = verify_page::render(&file, &grant);

    tracing::debug!(
        file_id = %file_id,
        allowed_domain = %allowed_domain,
        "Locked file, rendering verification page"
    );

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Html(page),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/d/{file_id}/download",
    tag = "download",
    params(
        ("file_id" = Uuid, Path, description = "APK file ID"),
        ("token" = Option<String>, Query, description = "Single-use download token"),
        ("t" = Option<String>, Query, description = "Advisory expiry hint, ignored")
    ),
    responses(
        (status = 200, description = "APK bytes", content_type = "application/vnd.android.package-archive"),
        (status = 403, description = "Download token expired or invalid", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "gated_download"))]
pub async fn gated_download(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    let file_id = parse_file_id(&file_id)?;
    let file = fetch_active_file(&state, file_id).await?;

    if let Some(hint) = &query.t {
        tracing::trace!(file_id = %file_id, expiry_hint = %hint, "Expiry hint present");
    }

    // The lock is read fresh from the row just fetched: locking a file
    // takes effect immediately, even for links already in the wild.
    let decision = resolver::resolve(
        file.domain_lock(),
        query.token.as_deref(),
        file_id,
        &state.grants,
    )
    .await;

    match decision {
        GateDecision::Serve => stream_file(&state, &file).await,
        GateDecision::Deny => {
            tracing::debug!(file_id = %file_id, "Download denied");
            Err(AppError::AccessDenied("Download token expired or invalid".to_string()).into())
        }
    }
}

/// Stream the stored object to the client. Failures here happen after
/// authorization, so they surface as 500s rather than denials.
async fn stream_file(state: &AppState, file: &ApkFile) -> Result<Response, HttpAppError> {
    let stream = state
        .storage
        .download_stream(&file.storage_key)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                file_id = %file.id,
                storage_key = %file.storage_key,
                "Failed to retrieve file from storage"
            );
            AppError::Storage(e.to_string())
        })?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    // Best-effort counter; a failed bump must not fail the download.
    let repo = state.repo.clone();
    let file_id = file.id;
    tokio::spawn(async move {
        if let Err(e) = repo.increment_download_count(file_id).await {
            tracing::warn!(error = %e, file_id = %file_id, "Failed to bump download count");
        }
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type.clone())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&file.original_filename),
        )
        .header(header::CONTENT_LENGTH, file.size_bytes)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}

/// Quoted-string value for the Content-Disposition header. Double quotes
/// and backslashes in the stored filename would break the quoting, so they
/// are stripped; CR/LF would be rejected by `HeaderValue` outright.
fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

#[cfg(test)]
mod tests {
    use super::{content_disposition, parse_file_id};
    use apkhub_core::AppError;

    #[test]
    fn test_parse_file_id_accepts_uuid() {
        assert!(parse_file_id("00000000-0000-0000-0000-000000000000").is_ok());
    }

    #[test]
    fn test_parse_file_id_maps_garbage_to_not_found() {
        match parse_file_id("not-a-uuid") {
            Err(AppError::NotFound(_)) => {}
            other => panic!("Expected NotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_content_disposition_plain_filename() {
        assert_eq!(
            content_disposition("app-release.apk"),
            "attachment; filename=\"app-release.apk\""
        );
    }

    #[test]
    fn test_content_disposition_strips_quote_breaking_chars() {
        assert_eq!(
            content_disposition("ap\"p\\release\r\n.apk"),
            "attachment; filename=\"apprelease.apk\""
        );
    }
}
