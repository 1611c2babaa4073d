//! APK upload handler.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::apks::ApkResponse;
use crate::state::AppState;
use apkhub_core::models::normalize_domain;
use apkhub_core::AppError;
use apkhub_db::NewApkFile;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";

/// Content types browsers commonly attach to an `.apk` part. Everything is
/// normalized to [`APK_CONTENT_TYPE`] before storage.
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    APK_CONTENT_TYPE,
    "application/octet-stream",
    "application/zip",
];

struct UploadedPart {
    filename: String,
    data: Vec<u8>,
}

/// Upload an APK file.
///
/// Multipart form with a required `file` part and an optional
/// `allowed_domain` text part that locks the file at creation time.
///
/// # Errors
/// - `AppError::InvalidInput` - missing part, bad extension or content type
/// - `AppError::PayloadTooLarge` - file exceeds the configured limit
/// - `AppError::Storage` - object store write failure
#[utoipa::path(
    post,
    path = "/api/v0/apks",
    tag = "apks",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "APK uploaded", body = ApkResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_apk"))]
pub async fn upload_apk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApkResponse>), HttpAppError> {
    let mut file_part: Option<UploadedPart> = None;
    let mut allowed_domain: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        // Field metadata is copied out before bytes()/text() consume the field
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .ok_or_else(|| AppError::InvalidInput("Missing filename".to_string()))?;

                validate_extension(&filename)?;
                if let Some(content_type) = field.content_type() {
                    validate_content_type(content_type)?;
                }

                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                if data.len() > state.config.max_apk_size_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File exceeds the {} MB limit",
                        state.config.max_apk_size_bytes / 1024 / 1024
                    ))
                    .into());
                }

                file_part = Some(UploadedPart {
                    filename,
                    data: data.to_vec(),
                });
            }
            Some("allowed_domain") => {
                let raw = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read allowed_domain: {}", e))
                })?;
                allowed_domain = normalize_domain(&raw);
            }
            _ => {}
        }
    }

    let part = file_part
        .ok_or_else(|| AppError::InvalidInput("Missing 'file' multipart field".to_string()))?;
    if part.data.is_empty() {
        return Err(AppError::InvalidInput("Uploaded file is empty".to_string()).into());
    }

    let file_id = Uuid::new_v4();
    let storage_key = apkhub_storage::apk_key(file_id, &part.filename);
    let size_bytes = part.data.len() as i64;

    state
        .storage
        .upload(&storage_key, APK_CONTENT_TYPE, part.data)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, storage_key = %storage_key, "Failed to store uploaded APK");
            AppError::Storage(e.to_string())
        })?;

    let apk = match state
        .repo
        .create(NewApkFile {
            id: file_id,
            original_filename: part.filename,
            content_type: APK_CONTENT_TYPE.to_string(),
            size_bytes,
            storage_key: storage_key.clone(),
            allowed_domain: allowed_domain.clone(),
        })
        .await
    {
        Ok(apk) => apk,
        Err(e) => {
            // The object is orphaned if the row insert fails; clean it up
            // off the request path.
            let storage = state.storage.clone();
            tokio::spawn(async move {
                if let Err(cleanup_err) = storage.delete(&storage_key).await {
                    tracing::warn!(
                        error = %cleanup_err,
                        storage_key = %storage_key,
                        "Failed to cleanup storage object after DB error"
                    );
                }
            });
            return Err(e.into());
        }
    };

    tracing::info!(
        file_id = %apk.id,
        size_bytes = apk.size_bytes,
        locked = apk.is_locked(),
        "APK uploaded"
    );

    Ok((StatusCode::CREATED, Json(ApkResponse::from(apk))))
}

/// Strip any path components the client attached to the filename.
fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string()
}

fn validate_extension(filename: &str) -> Result<(), AppError> {
    let ok = filename
        .rsplit('.')
        .next()
        .map(|ext| ext.eq_ignore_ascii_case("apk"))
        .unwrap_or(false)
        && filename.len() > 4;
    if ok {
        Ok(())
    } else {
        Err(AppError::InvalidInput(
            "Only .apk files are accepted".to_string(),
        ))
    }
}

fn validate_content_type(content_type: &str) -> Result<(), AppError> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    if ACCEPTED_CONTENT_TYPES.contains(&normalized.as_str()) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Unsupported content type: {}",
            content_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("app.apk"), "app.apk");
        assert_eq!(sanitize_filename("../../etc/app.apk"), "app.apk");
        assert_eq!(sanitize_filename("C:\\Users\\x\\app.apk"), "app.apk");
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("app.apk").is_ok());
        assert!(validate_extension("App-Release.APK").is_ok());
        assert!(validate_extension("app.zip").is_err());
        assert!(validate_extension("apk").is_err());
        assert!(validate_extension(".apk").is_err());
    }

    #[test]
    fn test_validate_content_type() {
        assert!(validate_content_type("application/vnd.android.package-archive").is_ok());
        assert!(validate_content_type("application/octet-stream").is_ok());
        assert!(validate_content_type("application/octet-stream; charset=binary").is_ok());
        assert!(validate_content_type("text/html").is_err());
    }
}
