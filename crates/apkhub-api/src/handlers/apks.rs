//! APK metadata management handlers.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use apkhub_core::models::{normalize_domain, ApkFile, ApkStatus};
use apkhub_core::AppError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Client-facing view of an APK file.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApkResponse {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_domain: Option<String>,
    pub download_count: i64,
    pub status: ApkStatus,
    pub created_at: DateTime<Utc>,
    /// Public link to hand out. Locked files render the verification page
    /// here; unlocked files stream directly.
    pub share_link: String,
}

impl From<ApkFile> for ApkResponse {
    fn from(apk: ApkFile) -> Self {
        let share_link = format!("/d/{}", apk.id);
        Self {
            id: apk.id,
            original_filename: apk.original_filename,
            content_type: apk.content_type,
            size_bytes: apk.size_bytes,
            allowed_domain: apk.allowed_domain,
            download_count: apk.download_count,
            status: apk.status,
            created_at: apk.created_at,
            share_link,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DomainLockRequest {
    /// Hostname to lock the file to, or null/empty to clear the lock.
    /// Accepts full URLs; scheme, path, and port are stripped.
    pub allowed_domain: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v0/apks/{id}",
    tag = "apks",
    params(
        ("id" = Uuid, Path, description = "APK file ID")
    ),
    responses(
        (status = 200, description = "APK metadata", body = ApkResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "APK not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(operation = "get_apk"))]
pub async fn get_apk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApkResponse>, HttpAppError> {
    let apk = state
        .repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("APK not found".to_string()))?;

    Ok(Json(ApkResponse::from(apk)))
}

#[utoipa::path(
    get,
    path = "/api/v0/apks",
    tag = "apks",
    params(
        ("limit" = Option<i64>, Query, description = "Page size (max 200, default 50)"),
        ("offset" = Option<i64>, Query, description = "Number of rows to skip")
    ),
    responses(
        (status = 200, description = "APK list", body = [ApkResponse]),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(operation = "list_apks"))]
pub async fn list_apks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<ApkResponse>>, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let apks = state.repo.list(limit, offset).await?;
    Ok(Json(apks.into_iter().map(ApkResponse::from).collect()))
}

/// Set or clear a file's domain lock.
///
/// Takes effect immediately for new requests. Grants already issued under
/// the previous lock keep their frozen domain until they expire or are
/// consumed.
#[utoipa::path(
    put,
    path = "/api/v0/apks/{id}/domain-lock",
    tag = "apks",
    params(
        ("id" = Uuid, Path, description = "APK file ID")
    ),
    request_body = DomainLockRequest,
    responses(
        (status = 200, description = "Updated APK metadata", body = ApkResponse),
        (status = 400, description = "Invalid domain", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "APK not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, body), fields(operation = "set_domain_lock"))]
pub async fn set_domain_lock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<DomainLockRequest>,
) -> Result<Json<ApkResponse>, HttpAppError> {
    let normalized = match body.allowed_domain.as_deref() {
        None | Some("") => None,
        Some(raw) => {
            let domain = normalize_domain(raw).ok_or_else(|| {
                AppError::InvalidInput(format!("Not a usable hostname: {}", raw))
            })?;
            Some(domain)
        }
    };

    let apk = state
        .repo
        .set_domain_lock(id, normalized.clone())
        .await?
        .ok_or_else(|| AppError::NotFound("APK not found".to_string()))?;

    tracing::info!(
        file_id = %id,
        allowed_domain = ?normalized,
        "Domain lock updated"
    );

    Ok(Json(ApkResponse::from(apk)))
}

#[utoipa::path(
    delete,
    path = "/api/v0/apks/{id}",
    tag = "apks",
    params(
        ("id" = Uuid, Path, description = "APK file ID")
    ),
    responses(
        (status = 204, description = "APK deleted"),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 404, description = "APK not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(operation = "delete_apk"))]
pub async fn delete_apk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let apk = state
        .repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("APK not found".to_string()))?;

    // Row first, then object. A dangling object is recoverable garbage; a
    // dangling row would keep serving dead links.
    let deleted = state.repo.delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound("APK not found".to_string()).into());
    }

    if let Err(e) = state.storage.delete(&apk.storage_key).await {
        tracing::warn!(
            error = %e,
            file_id = %id,
            storage_key = %apk.storage_key,
            "Failed to delete stored object, row already removed"
        );
    }

    tracing::info!(file_id = %id, "APK deleted");
    Ok(StatusCode::NO_CONTENT)
}
