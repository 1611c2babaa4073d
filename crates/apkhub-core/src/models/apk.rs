use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Lifecycle status of a hosted APK.
///
/// Suspended files are invisible on the download paths; they resolve as
/// NotFound rather than advertising their suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "apk_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ApkStatus {
    Active,
    Suspended,
}

/// A hosted APK file record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct ApkFile {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    /// Normalized hostname the file is locked to; `None` means no lock,
    /// serve directly.
    pub allowed_domain: Option<String>,
    pub download_count: i64,
    pub status: ApkStatus,
    pub created_at: DateTime<Utc>,
}

impl ApkFile {
    /// The lock in force for this file, if any. Empty strings in the
    /// database are treated the same as absent.
    pub fn domain_lock(&self) -> Option<&str> {
        self.allowed_domain.as_deref().filter(|d| !d.is_empty())
    }

    pub fn is_locked(&self) -> bool {
        self.domain_lock().is_some()
    }
}

/// Normalize a user-supplied domain into the canonical lock form:
/// lowercase hostname with no scheme, port, path, or trailing dot.
/// Returns `None` if nothing usable remains (meaning "no lock").
pub fn normalize_domain(input: &str) -> Option<String> {
    let mut s = input.trim().to_lowercase();

    if let Some(rest) = s.strip_prefix("https://") {
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix("http://") {
        s = rest.to_string();
    }

    if let Some(idx) = s.find('/') {
        s.truncate(idx);
    }
    if let Some(idx) = s.find(':') {
        s.truncate(idx);
    }
    let s = s.trim_end_matches('.').to_string();

    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain_strips_scheme_and_path() {
        assert_eq!(
            normalize_domain("https://Example.com/some/page"),
            Some("example.com".to_string())
        );
        assert_eq!(
            normalize_domain("http://shop.example.com:8080"),
            Some("shop.example.com".to_string())
        );
    }

    #[test]
    fn test_normalize_domain_plain_hostname() {
        assert_eq!(
            normalize_domain("  Trusted.IO  "),
            Some("trusted.io".to_string())
        );
        assert_eq!(
            normalize_domain("example.com."),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_normalize_domain_empty_means_no_lock() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("https://"), None);
    }

    #[test]
    fn test_domain_lock_treats_empty_as_unlocked() {
        let mut apk = ApkFile {
            id: Uuid::new_v4(),
            original_filename: "app.apk".to_string(),
            content_type: "application/vnd.android.package-archive".to_string(),
            size_bytes: 1024,
            storage_key: "apks/app.apk".to_string(),
            allowed_domain: Some(String::new()),
            download_count: 0,
            status: ApkStatus::Active,
            created_at: Utc::now(),
        };
        assert!(!apk.is_locked());

        apk.allowed_domain = Some("example.com".to_string());
        assert_eq!(apk.domain_lock(), Some("example.com"));
        assert!(apk.is_locked());
    }
}
