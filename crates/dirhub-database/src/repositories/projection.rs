//! PostgreSQL projection store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dirhub_core::error::{AppError, ErrorKind};
use dirhub_core::result::AppResult;
use dirhub_core::types::DirectoryId;
use dirhub_entity::{Directory, TrackedDirectory};

use crate::traits::ProjectionStore;

/// Projection store persisted in the `tracked_directories` table,
/// namespaced by application name.
#[derive(Debug, Clone)]
pub struct PgProjectionStore {
    pool: PgPool,
    app: String,
}

impl PgProjectionStore {
    /// Create a projection store for application `app`.
    pub fn new(pool: PgPool, app: impl Into<String>) -> Self {
        Self {
            pool,
            app: app.into(),
        }
    }
}

#[async_trait]
impl ProjectionStore for PgProjectionStore {
    async fn create_directory(&self, directory: &Directory) -> AppResult<TrackedDirectory> {
        sqlx::query(
            "INSERT INTO tracked_directories (app, id, deleted_at) VALUES ($1, $2, $3) \
             ON CONFLICT (app, id) DO NOTHING",
        )
        .bind(&self.app)
        .bind(directory.id)
        .bind(directory.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to track directory", e))?;

        self.get(directory.id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Tracked directory {} vanished", directory.id)))
    }

    async fn delete_directory(
        &self,
        id: DirectoryId,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<TrackedDirectory> {
        sqlx::query_as::<_, TrackedDirectory>(
            "INSERT INTO tracked_directories (app, id, deleted_at) VALUES ($1, $2, $3) \
             ON CONFLICT (app, id) DO UPDATE \
             SET deleted_at = COALESCE(tracked_directories.deleted_at, EXCLUDED.deleted_at) \
             RETURNING id, deleted_at",
        )
        .bind(&self.app)
        .bind(id)
        .bind(deleted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark tracked directory deleted", e)
        })
    }

    async fn get(&self, id: DirectoryId) -> AppResult<Option<TrackedDirectory>> {
        sqlx::query_as::<_, TrackedDirectory>(
            "SELECT id, deleted_at FROM tracked_directories WHERE app = $1 AND id = $2",
        )
        .bind(&self.app)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find tracked directory", e))
    }
}
