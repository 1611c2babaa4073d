//! ApkHub database layer
//!
//! Repositories over Postgres via sqlx. Migrations live in `migrations/`
//! and run at startup through [`run_migrations`].

mod apk;

pub use apk::{ApkRepository, NewApkFile};

use sqlx::PgPool;

/// Run pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
