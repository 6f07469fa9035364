//! Dual-tier entity storage.
//!
//! Each entity kind has two tiers implementing the same [`StorageTier`]
//! capability set: a volatile [`MemoryStorage`] and a durable
//! [`SqliteStorage`]. The [`Storage`] router picks the tier(s) for every
//! call from a [`StorageType`] selector and reports one [`TierResult`] per
//! tier it touched.

mod memory;
mod records;
mod router;
mod sqlite;

pub use memory::MemoryStorage;
pub use router::Storage;
pub use sqlite::{init_db, SqliteEntity, SqliteQuery, SqliteStorage};

use futures::future::{join_all, BoxFuture};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::queue::{OperationError, OperationHandle};

/// Something a tier can hold: identified, cloneable, patchable.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone
        + PartialEq
        + fmt::Debug
        + fmt::Display
        + Send
        + Sync
        + 'static
        + for<'q> sqlx::Encode<'q, sqlx::Sqlite>
        + sqlx::Type<sqlx::Sqlite>;
    /// Field changes accepted by `update`.
    type Patch: Clone + Send + Sync + 'static;

    /// Short lowercase name used in logs, errors and queue names.
    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    fn apply(&mut self, patch: Self::Patch);
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt {kind} row: {message}")]
    Corrupt { kind: &'static str, message: String },

    #[error("operation cancelled before execution")]
    Cancelled,

    #[error("operation abandoned by its queue")]
    Abandoned,
}

impl StorageError {
    pub fn not_found<E: Entity>(id: &E::Id) -> Self {
        StorageError::NotFound {
            kind: E::KIND,
            id: id.to_string(),
        }
    }

    pub fn already_exists<E: Entity>(id: &E::Id) -> Self {
        StorageError::AlreadyExists {
            kind: E::KIND,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<OperationError> for StorageError {
    fn from(e: OperationError) -> Self {
        match e {
            OperationError::Cancelled => StorageError::Cancelled,
            OperationError::Abandoned => StorageError::Abandoned,
        }
    }
}

/// Which tier(s) a storage call touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageType {
    /// Touch nothing; the call reports no results.
    None,
    Memory,
    #[default]
    Durable,
    /// Memory and durable, reported in that order.
    All,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::None => write!(f, "none"),
            StorageType::Memory => write!(f, "memory"),
            StorageType::Durable => write!(f, "durable"),
            StorageType::All => write!(f, "all"),
        }
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(StorageType::None),
            "memory" => Ok(StorageType::Memory),
            "durable" | "sqlite" => Ok(StorageType::Durable),
            "all" => Ok(StorageType::All),
            _ => Err(format!(
                "Invalid storage type '{}'. Valid options: none, memory, durable, all",
                s
            )),
        }
    }
}

/// The outcome of one call on one tier.
#[derive(Debug)]
pub struct TierResult<T> {
    pub storage_type: StorageType,
    pub result: StorageResult<T>,
}

impl<T> TierResult<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Collapses per-tier results into the successful values, or the first
/// failure in result order.
pub fn collect_results<T>(results: Vec<TierResult<T>>) -> StorageResult<Vec<T>> {
    results.into_iter().map(|r| r.result).collect()
}

/// The CRUD capability set every tier provides.
///
/// Calls schedule work immediately on the tier's queue; the returned handle
/// resolves exactly once with the outcome.
pub trait StorageTier<E: Entity>: Send + Sync {
    /// The tag this tier reports in router results.
    fn storage_type(&self) -> StorageType;

    fn count(&self) -> OperationHandle<usize, StorageError>;

    fn create(&self, entity: E) -> OperationHandle<E, StorageError>;

    /// Creates `entities` in the order given, resolving to one result per
    /// entity in that same order.
    ///
    /// By default this schedules one `create` per entity up front, which
    /// keeps their order only on a serial queue. Tiers on a concurrent queue
    /// override it to apply the batch as a single unit.
    fn create_many(&self, entities: Vec<E>) -> BoxFuture<'static, Vec<StorageResult<E>>> {
        let handles: Vec<_> = entities.into_iter().map(|e| self.create(e)).collect();
        Box::pin(join_all(handles))
    }

    fn read(&self, id: E::Id) -> OperationHandle<E, StorageError>;

    fn read_all(&self) -> OperationHandle<Vec<E>, StorageError>;

    fn update(&self, id: E::Id, patch: E::Patch) -> OperationHandle<E, StorageError>;

    fn delete(&self, id: E::Id) -> OperationHandle<(), StorageError>;

    fn delete_all(&self) -> OperationHandle<(), StorageError>;
}
