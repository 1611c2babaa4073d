use apkhub_core::models::{ApkFile, ApkStatus};
use apkhub_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Input for inserting a new APK file row.
#[derive(Debug, Clone)]
pub struct NewApkFile {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub allowed_domain: Option<String>,
}

/// Repository for APK file metadata.
#[derive(Clone)]
pub struct ApkRepository {
    pool: PgPool,
}

impl ApkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[tracing::instrument(skip(self, input), fields(
        db.table = "apk_files",
        db.operation = "insert",
        apk_id = %input.id
    ))]
    pub async fn create(&self, input: NewApkFile) -> Result<ApkFile, AppError> {
        let apk = sqlx::query_as::<_, ApkFile>(
            r#"
            INSERT INTO apk_files (
                id, original_filename, content_type, size_bytes, storage_key, allowed_domain
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, original_filename, content_type, size_bytes, storage_key,
                      allowed_domain, download_count, status, created_at
            "#,
        )
        .bind(input.id)
        .bind(&input.original_filename)
        .bind(&input.content_type)
        .bind(input.size_bytes)
        .bind(&input.storage_key)
        .bind(&input.allowed_domain)
        .fetch_one(&self.pool)
        .await?;

        Ok(apk)
    }

    #[tracing::instrument(skip(self), fields(db.table = "apk_files", db.operation = "select"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<ApkFile>, AppError> {
        let apk = sqlx::query_as::<_, ApkFile>(
            r#"
            SELECT id, original_filename, content_type, size_bytes, storage_key,
                   allowed_domain, download_count, status, created_at
            FROM apk_files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(apk)
    }

    /// Fetch a file only if it is active. This is the lookup the download
    /// paths use; suspended files are indistinguishable from missing ones.
    #[tracing::instrument(skip(self), fields(db.table = "apk_files", db.operation = "select"))]
    pub async fn get_if_active(&self, id: Uuid) -> Result<Option<ApkFile>, AppError> {
        let apk = sqlx::query_as::<_, ApkFile>(
            r#"
            SELECT id, original_filename, content_type, size_bytes, storage_key,
                   allowed_domain, download_count, status, created_at
            FROM apk_files
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(ApkStatus::Active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(apk)
    }

    #[tracing::instrument(skip(self), fields(db.table = "apk_files", db.operation = "select"))]
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ApkFile>, AppError> {
        let apks = sqlx::query_as::<_, ApkFile>(
            r#"
            SELECT id, original_filename, content_type, size_bytes, storage_key,
                   allowed_domain, download_count, status, created_at
            FROM apk_files
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(apks)
    }

    /// Set or clear the domain lock. Returns the updated row, or None if
    /// the file does not exist.
    #[tracing::instrument(skip(self), fields(db.table = "apk_files", db.operation = "update"))]
    pub async fn set_domain_lock(
        &self,
        id: Uuid,
        allowed_domain: Option<String>,
    ) -> Result<Option<ApkFile>, AppError> {
        let apk = sqlx::query_as::<_, ApkFile>(
            r#"
            UPDATE apk_files
            SET allowed_domain = $2
            WHERE id = $1
            RETURNING id, original_filename, content_type, size_bytes, storage_key,
                      allowed_domain, download_count, status, created_at
            "#,
        )
        .bind(id)
        .bind(&allowed_domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(apk)
    }

    #[tracing::instrument(skip(self), fields(db.table = "apk_files", db.operation = "update"))]
    pub async fn increment_download_count(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE apk_files SET download_count = download_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a row; returns true if one was removed.
    #[tracing::instrument(skip(self), fields(db.table = "apk_files", db.operation = "delete"))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM apk_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
