//! Application state.
//!
//! The state is constructed once at startup and injected into handlers via
//! Axum's `State` extractor. The grant store lives here rather than as a
//! process-wide global so it stays mockable and its lifecycle is explicit.

use crate::domain_lock::GrantStore;
use apkhub_core::Config;
use apkhub_db::ApkRepository;
use apkhub_storage::Storage;
use std::sync::Arc;

/// Main application state shared by all requests.
pub struct AppState {
    pub config: Config,
    pub repo: ApkRepository,
    pub storage: Arc<dyn Storage>,
    /// Pending download grants for domain-locked files.
    pub grants: GrantStore,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
