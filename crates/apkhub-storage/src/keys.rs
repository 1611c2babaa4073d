//! Storage key generation and validation, shared by all backends.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Generate the storage key for an APK file: `apks/{file_id}/{filename}`.
pub fn apk_key(file_id: Uuid, filename: &str) -> String {
    format!("apks/{}/{}", file_id, filename)
}

/// Reject keys that could escape the storage root.
pub(crate) fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.is_empty() {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apk_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            apk_key(id, "app.apk"),
            "apks/00000000-0000-0000-0000-000000000000/app.apk"
        );
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("apks/x/app.apk").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }
}
