//! Application setup and initialization
//!
//! All startup logic lives here rather than in main.rs so it stays
//! organized and testable.

pub mod database;
pub mod routes;
pub mod server;

use crate::domain_lock::GrantStore;
use crate::state::AppState;
use anyhow::{Context, Result};
use apkhub_core::Config;
use apkhub_db::ApkRepository;
use std::sync::Arc;
use std::time::Duration;

/// Initialize the entire application: telemetry, database, storage,
/// state, and routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated"
    );

    let pool = database::setup_database(&config).await?;
    let repo = ApkRepository::new(pool);

    let storage = apkhub_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;

    let grants = GrantStore::new(
        config.link_secret.as_bytes().to_vec(),
        Duration::from_secs(config.grant_ttl_secs),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        repo,
        storage,
        grants,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
