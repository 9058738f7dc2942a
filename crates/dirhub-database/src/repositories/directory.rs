//! PostgreSQL directory store.
//!
//! Transitive reads are single recursive statements carrying a depth
//! column, so ancestries come back nearest first and subtrees come back
//! level by level. Writes run in SERIALIZABLE transactions: a create under
//! a subtree that is concurrently being deleted aborts with a database
//! error instead of leaving a live child below a deleted parent.
//!
//! Fast reads use `SET TRANSACTION AS OF SYSTEM TIME`, the
//! bounded-staleness form understood by PostgreSQL-wire databases such as
//! CockroachDB.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use dirhub_core::error::{AppError, ErrorKind};
use dirhub_core::result::AppResult;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_entity::{Directory, NewDirectory};

use crate::mode::StoreMode;
use crate::traits::{Reader, RootReader, RootWriter, Writer};

const SELECT_DIRECTORY: &str = "SELECT id, name, metadata, parent_id, created_at, updated_at, deleted_at \
     FROM directories WHERE id = $1 AND ($2 OR deleted_at IS NULL)";

const SELECT_ANCESTORS: &str = "WITH RECURSIVE ancestors (id, parent_id, depth) AS ( \
        SELECT id, parent_id, 0 FROM directories WHERE id = $1 \
        UNION ALL \
        SELECT d.id, d.parent_id, a.depth + 1 \
        FROM directories d INNER JOIN ancestors a ON d.id = a.parent_id \
     ) SELECT id FROM ancestors WHERE depth > 0 ORDER BY depth ASC LIMIT $2 OFFSET $3";

const SELECT_ANCESTORS_UNTIL: &str = "WITH RECURSIVE ancestors (id, parent_id, depth) AS ( \
        SELECT id, parent_id, 0 FROM directories WHERE id = $1 \
        UNION ALL \
        SELECT d.id, d.parent_id, a.depth + 1 \
        FROM directories d INNER JOIN ancestors a ON d.id = a.parent_id \
        WHERE a.id <> $2 \
     ) SELECT id FROM ancestors WHERE depth > 0 ORDER BY depth ASC";

const SELECT_DESCENDANTS: &str = "WITH RECURSIVE subtree (id, depth) AS ( \
        SELECT id, 0 FROM directories WHERE id = $1 \
        UNION ALL \
        SELECT d.id, s.depth + 1 \
        FROM directories d INNER JOIN subtree s ON d.parent_id = s.id \
        WHERE $2 OR d.deleted_at IS NULL \
     ) SELECT id FROM subtree WHERE depth > 0 ORDER BY depth ASC, id ASC LIMIT $3 OFFSET $4";

const SELECT_ROOTS: &str = "SELECT id FROM directories \
     WHERE parent_id IS NULL AND ($1 OR deleted_at IS NULL) \
     ORDER BY created_at ASC, id ASC LIMIT $2 OFFSET $3";

const LOCK_LIVE_PARENT: &str =
    "SELECT id FROM directories WHERE id = $1 AND deleted_at IS NULL FOR UPDATE";

const INSERT_DIRECTORY: &str = "INSERT INTO directories \
        (id, name, metadata, parent_id, created_at, updated_at, deleted_at) \
     VALUES ($1, $2, $3, $4, $5, $5, NULL) \
     RETURNING id, name, metadata, parent_id, created_at, updated_at, deleted_at";

const SOFT_DELETE_SUBTREE: &str = "WITH RECURSIVE subtree (id) AS ( \
        SELECT id FROM directories WHERE id = $1 \
        UNION ALL \
        SELECT d.id FROM directories d INNER JOIN subtree s ON d.parent_id = s.id \
     ) UPDATE directories SET deleted_at = $2, updated_at = $2 \
     WHERE id IN (SELECT id FROM subtree) AND deleted_at IS NULL \
     RETURNING id, name, metadata, parent_id, created_at, updated_at, deleted_at";

/// Directory store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
    mode: StoreMode,
}

impl PgDirectoryStore {
    /// Create a store over `pool` in the given mode.
    pub fn new(pool: PgPool, mode: StoreMode) -> Self {
        Self { pool, mode }
    }

    /// Another handle on the same pool with a different mode.
    pub fn view(&self, mode: StoreMode) -> Self {
        Self {
            pool: self.pool.clone(),
            mode,
        }
    }

    /// The mode of this handle.
    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    async fn begin_read(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin read transaction"))?;
        if let Some(statement) = self.mode.staleness.map(bounded_staleness_statement) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to enable bounded-staleness reads"))?;
        }
        Ok(tx)
    }

    async fn begin_write(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.mode.ensure_writable()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin write transaction"))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to set isolation level"))?;
        Ok(tx)
    }

    async fn insert(&self, conn: &mut PgConnection, data: NewDirectory) -> AppResult<Directory> {
        let draft = Directory::create(data, Utc::now());
        sqlx::query_as::<_, Directory>(INSERT_DIRECTORY)
            .bind(draft.id)
            .bind(&draft.name)
            .bind(Json(&draft.metadata))
            .bind(draft.parent)
            .bind(draft.created_at)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error("Failed to insert directory"))
    }
}

#[async_trait]
impl Reader for PgDirectoryStore {
    async fn get_directory(&self, id: DirectoryId, opts: GetOptions) -> AppResult<Directory> {
        let mut tx = self.begin_read().await?;
        let directory = fetch_visible(&mut tx, id, opts.with_deleted).await?;
        finish(tx).await?;
        Ok(directory)
    }

    async fn get_parents(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let (limit, offset) = page_bounds(&opts);
        let mut tx = self.begin_read().await?;
        fetch_visible(&mut tx, id, opts.with_deleted).await?;

        let parents = sqlx::query_scalar::<_, DirectoryId>(SELECT_ANCESTORS)
            .bind(id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to list parents"))?;
        finish(tx).await?;
        Ok(parents)
    }

    async fn get_parents_until(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        if child == ancestor {
            return Ok(Vec::new());
        }

        let mut tx = self.begin_read().await?;
        fetch_visible(&mut tx, child, opts.with_deleted).await?;

        let chain = sqlx::query_scalar::<_, DirectoryId>(SELECT_ANCESTORS_UNTIL)
            .bind(child)
            .bind(ancestor)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to list parents"))?;
        finish(tx).await?;

        if chain.last() != Some(&ancestor) {
            return Err(AppError::not_found(format!(
                "Directory {ancestor} is not an ancestor of {child}"
            )));
        }
        Ok(opts.paginate(chain))
    }

    async fn get_children(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let (limit, offset) = page_bounds(&opts);
        let mut tx = self.begin_read().await?;
        fetch_visible(&mut tx, id, opts.with_deleted).await?;

        let children = sqlx::query_scalar::<_, DirectoryId>(SELECT_DESCENDANTS)
            .bind(id)
            .bind(opts.with_deleted)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to list children"))?;
        finish(tx).await?;
        Ok(children)
    }

    fn as_root_reader(&self) -> Option<&dyn RootReader> {
        Some(self)
    }
}

#[async_trait]
impl RootReader for PgDirectoryStore {
    async fn list_roots(&self, opts: ListOptions) -> AppResult<Vec<DirectoryId>> {
        let (limit, offset) = page_bounds(&opts);
        let mut tx = self.begin_read().await?;
        let roots = sqlx::query_scalar::<_, DirectoryId>(SELECT_ROOTS)
            .bind(opts.with_deleted)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to list roots"))?;
        finish(tx).await?;
        Ok(roots)
    }
}

#[async_trait]
impl Writer for PgDirectoryStore {
    async fn create_directory(&self, data: NewDirectory) -> AppResult<Directory> {
        let parent = data.validate_child()?;
        let mut tx = self.begin_write().await?;

        sqlx::query_scalar::<_, DirectoryId>(LOCK_LIVE_PARENT)
            .bind(parent)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock parent directory"))?
            .ok_or_else(|| AppError::not_found(format!("Parent directory {parent} not found")))?;

        let directory = self.insert(&mut tx, data).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit directory creation"))?;

        info!(directory_id = %directory.id, parent_id = %parent, "Directory created");
        Ok(directory)
    }

    async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>> {
        let mut tx = self.begin_write().await?;

        let deleted = sqlx::query_as::<_, Directory>(SOFT_DELETE_SUBTREE)
            .bind(id)
            .bind(Utc::now())
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error("Failed to delete directory"))?;

        if deleted.is_empty() {
            return Err(AppError::not_found(format!(
                "Directory {id} not found or already deleted"
            )));
        }
        tx.commit()
            .await
            .map_err(db_error("Failed to commit directory deletion"))?;

        info!(directory_id = %id, affected = deleted.len(), "Directory deleted");
        Ok(deleted)
    }

    fn as_root_writer(&self) -> Option<&dyn RootWriter> {
        Some(self)
    }
}

#[async_trait]
impl RootWriter for PgDirectoryStore {
    async fn create_root(&self, data: NewDirectory) -> AppResult<Directory> {
        data.validate_root()?;
        let mut tx = self.begin_write().await?;
        let directory = self.insert(&mut tx, data).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit root creation"))?;

        info!(directory_id = %directory.id, "Root directory created");
        Ok(directory)
    }
}

async fn fetch_visible(
    conn: &mut PgConnection,
    id: DirectoryId,
    with_deleted: bool,
) -> AppResult<Directory> {
    sqlx::query_as::<_, Directory>(SELECT_DIRECTORY)
        .bind(id)
        .bind(with_deleted)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error("Failed to find directory"))?
        .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))
}

async fn finish(tx: Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(db_error("Failed to finish read transaction"))
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        debug!(error = %e, context, "Database call failed");
        AppError::with_source(ErrorKind::Database, context, e)
    }
}

fn page_bounds(opts: &ListOptions) -> (i64, i64) {
    let limit = i64::try_from(opts.limit()).unwrap_or(i64::MAX);
    let offset = i64::try_from(opts.offset()).unwrap_or(i64::MAX);
    (limit, offset)
}

pub(crate) fn bounded_staleness_statement(bound: Duration) -> String {
    format!(
        "SET TRANSACTION AS OF SYSTEM TIME '-{}ms'",
        bound.as_millis().max(1)
    )
}
