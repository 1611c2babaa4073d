//! OpenAPI documentation.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use apkhub_core::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct ApiKeyAddon;

impl Modify for ApiKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ApkHub API",
        version = "0.1.0",
        description = "APK hosting service with domain-locked download links. Files are stored in S3-compatible or local storage; each file gets a shareable /d/{id} link, and an optional per-file domain lock gates downloads behind a referer verification page with single-use tokens. Management endpoints are versioned under /api/v0/."
    ),
    paths(
        // Downloads
        handlers::download::share_link,
        handlers::download::gated_download,
        // APK management
        handlers::upload::upload_apk,
        handlers::apks::get_apk,
        handlers::apks::list_apks,
        handlers::apks::set_domain_lock,
        handlers::apks::delete_apk,
        // Health
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ApkStatus,
            handlers::apks::ApkResponse,
            handlers::apks::PaginationQuery,
            handlers::apks::DomainLockRequest,
            error::ErrorResponse,
        )
    ),
    modifiers(&ApiKeyAddon),
    tags(
        (name = "download", description = "Public download links and the domain-lock verification flow"),
        (name = "apks", description = "APK upload, metadata, domain-lock, and deletion operations"),
        (name = "health", description = "Service health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::get_openapi_spec;

    /// The public document exposes the client-facing response schema only;
    /// the row type carries internals like `storage_key` and must not leak.
    #[test]
    fn test_openapi_components_hide_internal_row_type() {
        let spec = get_openapi_spec();
        let components = spec.components.expect("spec has components");
        assert!(components.schemas.contains_key("ApkResponse"));
        assert!(!components.schemas.contains_key("ApkFile"));
    }

    #[test]
    fn test_openapi_lists_download_routes() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/d/{file_id}"));
        assert!(spec.paths.paths.contains_key("/d/{file_id}/download"));
    }
}
