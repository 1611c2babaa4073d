//! Configuration module
//!
//! Environment-driven configuration for the API binary: server, database,
//! storage backend selection, upload limits, and the download-gate settings.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_MAX_APK_SIZE_MB: usize = 200;
const DEFAULT_GRANT_TTL_SECS: u64 = 60;

/// Application configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Service key required on the `/api/v0/*` management routes.
    pub service_api_key: String,
    /// Secret used to derive download grant tokens.
    pub link_secret: String,
    /// Lifetime of a download grant. Long enough for a page redirect,
    /// short enough to prevent reuse or sharing.
    pub grant_ttl_secs: u64,
    pub max_apk_size_bytes: usize,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (R2, Tebi, Storj, Supabase, MinIO).
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(s) => Some(StorageBackend::from_str(&s)?),
            Err(_) => None,
        };

        Ok(Config {
            server_port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            service_api_key: env::var("SERVICE_API_KEY")
                .map_err(|_| anyhow::anyhow!("SERVICE_API_KEY environment variable not set"))?,
            link_secret: env::var("LINK_SECRET")
                .map_err(|_| anyhow::anyhow!("LINK_SECRET environment variable not set"))?,
            grant_ttl_secs: env::var("DOWNLOAD_GRANT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GRANT_TTL_SECS),
            max_apk_size_bytes: env::var("MAX_APK_SIZE_MB")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(DEFAULT_MAX_APK_SIZE_MB)
                * 1024
                * 1024,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.service_api_key.len() < 32 {
            return Err(anyhow::anyhow!(
                "SERVICE_API_KEY must be at least 32 characters long"
            ));
        }
        if self.link_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "LINK_SECRET must be at least 32 characters long"
            ));
        }
        if self.grant_ttl_secs == 0 {
            return Err(anyhow::anyhow!("DOWNLOAD_GRANT_TTL_SECS must be positive"));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_port: 3000,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: "postgres://localhost/apkhub".to_string(),
            db_max_connections: 5,
            service_api_key: "0123456789abcdef0123456789abcdef".to_string(),
            link_secret: "fedcba9876543210fedcba9876543210".to_string(),
            grant_ttl_secs: 60,
            max_apk_size_bytes: 200 * 1024 * 1024,
            storage_backend: Some(StorageBackend::Local),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/apkhub".to_string()),
            local_storage_base_url: Some("http://localhost:3000/files".to_string()),
        }
    }

    #[test]
    fn test_validate_accepts_long_secrets() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_link_secret() {
        let mut config = test_config();
        config.link_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
