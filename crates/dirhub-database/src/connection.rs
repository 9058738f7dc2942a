//! PostgreSQL connection pool for the directory and projection stores.

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use dirhub_core::config::DatabaseConfig;
use dirhub_core::error::{AppError, ErrorKind};
use dirhub_core::result::AppResult;

use crate::mode::{AccessMode, StoreMode};
use crate::repositories::directory::bounded_staleness_statement;
use crate::repositories::{PgDirectoryStore, PgProjectionStore};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// A connection pool plus the mode every directory store built from it uses.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
    mode: StoreMode,
}

impl DatabasePool {
    /// Connect and check that the backend supports `mode`.
    ///
    /// Bounded-staleness reads need `AS OF SYSTEM TIME`; a backend that
    /// rejects it fails here with `Configuration` rather than on the first
    /// read.
    pub async fn connect(config: &DatabaseConfig, mode: StoreMode) -> AppResult<Self> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            read_only = mode.access == AccessMode::ReadOnly,
            staleness_ms = mode.staleness.map(|d| d.as_millis() as u64),
            "Connecting to directory database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        let db = Self { pool, mode };
        if let Some(bound) = mode.staleness {
            db.check_fast_reads(bound).await?;
        }
        Ok(db)
    }

    async fn check_fast_reads(&self, bound: Duration) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        if let Err(e) = sqlx::query(&bounded_staleness_statement(bound))
            .execute(&mut *tx)
            .await
        {
            warn!(error = %e, "Backend rejected AS OF SYSTEM TIME");
            return Err(AppError::with_source(
                ErrorKind::Configuration,
                "store.fast_reads requires a backend with AS OF SYSTEM TIME (CockroachDB)",
                e,
            ));
        }
        tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to end transaction", e)
        })?;
        Ok(())
    }

    /// Apply the embedded schema migrations.
    ///
    /// Runs regardless of the store mode: a read-only agent still owns its
    /// projection table.
    pub async fn migrate(&self) -> AppResult<()> {
        info!(
            available = MIGRATOR.iter().count(),
            "Applying schema migrations"
        );
        MIGRATOR.run(&self.pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;
        Ok(())
    }

    /// A directory store in this pool's mode.
    pub fn directory_store(&self) -> PgDirectoryStore {
        PgDirectoryStore::new(self.pool.clone(), self.mode)
    }

    /// The projection store of application `app`.
    pub fn projection_store(&self, app: impl Into<String>) -> PgProjectionStore {
        PgProjectionStore::new(self.pool.clone(), app)
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    let Some(at) = url.find('@') else {
        return url.to_string();
    };
    let credentials_start = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url[..at].rfind(':') {
        Some(colon) if colon > credentials_start => {
            format!("{}:****@{}", &url[..colon], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
