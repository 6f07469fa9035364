//! Durable tier backed by SQLite.
//!
//! Mutations for a tier go through one serial queue, so writes to a table
//! never interleave. Reads use a separate concurrent queue.

use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{FromRow, Sqlite};
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use super::{Entity, StorageError, StorageResult, StorageTier, StorageType};
use crate::queue::{OperationHandle, OperationQueue};

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Opens (creating if needed) the database at `path` and runs migrations.
pub async fn init_db(path: &Path) -> StorageResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(path = %path.display(), "database ready");

    Ok(pool)
}

/// Table mapping for an entity kind.
///
/// `COLUMNS` lists every column, identifier first; `bind_values` must bind
/// in exactly that order.
pub trait SqliteEntity: Entity {
    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;

    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: Self::Row) -> StorageResult<Self>;

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

/// Durable tier for one entity kind.
pub struct SqliteStorage<E> {
    pool: SqlitePool,
    writes: OperationQueue,
    reads: OperationQueue,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SqliteStorage<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            writes: self.writes.clone(),
            reads: self.reads.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: SqliteEntity> SqliteStorage<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writes: OperationQueue::serial(format!("{}.durable.write", E::KIND)),
            reads: OperationQueue::concurrent(format!("{}.durable.read", E::KIND)),
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl<E: SqliteEntity> StorageTier<E> for SqliteStorage<E> {
    fn storage_type(&self) -> StorageType {
        StorageType::Durable
    }

    fn count(&self) -> OperationHandle<usize, StorageError> {
        let pool = self.pool.clone();
        self.reads.enqueue(move || count_rows::<E>(pool))
    }

    fn create(&self, entity: E) -> OperationHandle<E, StorageError> {
        let pool = self.pool.clone();
        self.writes.enqueue(move || insert_row(pool, entity))
    }

    fn read(&self, id: E::Id) -> OperationHandle<E, StorageError> {
        let pool = self.pool.clone();
        self.reads.enqueue(move || fetch_row::<E>(pool, id))
    }

    fn read_all(&self) -> OperationHandle<Vec<E>, StorageError> {
        let pool = self.pool.clone();
        self.reads.enqueue(move || fetch_all_rows::<E>(pool))
    }

    fn update(&self, id: E::Id, patch: E::Patch) -> OperationHandle<E, StorageError> {
        let pool = self.pool.clone();
        self.writes.enqueue(move || update_row::<E>(pool, id, patch))
    }

    fn delete(&self, id: E::Id) -> OperationHandle<(), StorageError> {
        let pool = self.pool.clone();
        self.writes.enqueue(move || delete_row::<E>(pool, id))
    }

    fn delete_all(&self) -> OperationHandle<(), StorageError> {
        let pool = self.pool.clone();
        self.writes.enqueue(move || delete_all_rows::<E>(pool))
    }
}

fn select_by_id_sql<E: SqliteEntity>() -> String {
    format!("SELECT * FROM {} WHERE id = ?", E::TABLE)
}

fn insert_sql<E: SqliteEntity>() -> String {
    let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders
    )
}

fn update_sql<E: SqliteEntity>() -> String {
    let assignments: Vec<String> = E::COLUMNS.iter().map(|c| format!("{} = ?", c)).collect();
    format!(
        "UPDATE {} SET {} WHERE id = ?",
        E::TABLE,
        assignments.join(", ")
    )
}

async fn fetch_optional<E: SqliteEntity>(
    pool: &SqlitePool,
    id: E::Id,
) -> StorageResult<Option<E>> {
    let sql = select_by_id_sql::<E>();
    let row: Option<E::Row> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
    row.map(E::from_row).transpose()
}

async fn count_rows<E: SqliteEntity>(pool: SqlitePool) -> StorageResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(&pool).await?;
    Ok(count as usize)
}

/// Inserts, commits, then reads the row back so the caller gets what the
/// store actually holds.
async fn insert_row<E: SqliteEntity>(pool: SqlitePool, entity: E) -> StorageResult<E> {
    let id = entity.id();
    let sql = insert_sql::<E>();

    let mut tx = pool.begin().await?;
    entity
        .bind_values(sqlx::query(&sql))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(kind = E::KIND, %id, "created in durable store");

    let persisted = fetch_optional::<E>(&pool, id.clone()).await?;
    persisted.ok_or_else(|| StorageError::not_found::<E>(&id))
}

async fn fetch_row<E: SqliteEntity>(pool: SqlitePool, id: E::Id) -> StorageResult<E> {
    let found = fetch_optional::<E>(&pool, id.clone()).await?;
    found.ok_or_else(|| StorageError::not_found::<E>(&id))
}

async fn fetch_all_rows<E: SqliteEntity>(pool: SqlitePool) -> StorageResult<Vec<E>> {
    let sql = format!("SELECT * FROM {} ORDER BY id", E::TABLE);
    let rows: Vec<E::Row> = sqlx::query_as(&sql).fetch_all(&pool).await?;
    rows.into_iter().map(E::from_row).collect()
}

async fn update_row<E: SqliteEntity>(
    pool: SqlitePool,
    id: E::Id,
    patch: E::Patch,
) -> StorageResult<E> {
    let select_sql = select_by_id_sql::<E>();
    let update_sql = update_sql::<E>();

    let mut tx = pool.begin().await?;

    let row: Option<E::Row> = sqlx::query_as(&select_sql)
        .bind(id.clone())
        .fetch_optional(&mut *tx)
        .await?;
    let mut entity = match row {
        Some(row) => E::from_row(row)?,
        None => return Err(StorageError::not_found::<E>(&id)),
    };

    entity.apply(patch);

    entity
        .bind_values(sqlx::query(&update_sql))
        .bind(id.clone())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::debug!(kind = E::KIND, %id, "updated in durable store");

    let new_id = entity.id();
    let persisted = fetch_optional::<E>(&pool, new_id.clone()).await?;
    persisted.ok_or_else(|| StorageError::not_found::<E>(&new_id))
}

async fn delete_row<E: SqliteEntity>(pool: SqlitePool, id: E::Id) -> StorageResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
    let result = sqlx::query(&sql).bind(id.clone()).execute(&pool).await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found::<E>(&id));
    }

    tracing::debug!(kind = E::KIND, %id, "deleted from durable store");
    Ok(())
}

/// Bulk delete in one statement, committed as one transaction.
async fn delete_all_rows<E: SqliteEntity>(pool: SqlitePool) -> StorageResult<()> {
    let sql = format!("DELETE FROM {}", E::TABLE);

    let mut tx = pool.begin().await?;
    let result = sqlx::query(&sql).execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::debug!(
        kind = E::KIND,
        rows = result.rows_affected(),
        "cleared durable tier"
    );
    Ok(())
}
