//! MyDictionary Core Library
//!
//! Dual-tier entity storage (volatile memory + durable SQLite), the API
//! clients for the MyDictionary backend, and the sync engine that pulls
//! remote state into both tiers.

pub mod api;
pub mod context;
pub mod models;
pub mod queue;
pub mod storage;
pub mod sync;

pub use api::{
    AccountApi, AccountClient, ApiError, AuthRequest, AuthResponse, CourseApi, CourseClient,
    JwtApi, JwtClient, LanguageApi, LanguageClient, RequestDispatcher, WordApi, WordClient,
};
pub use context::{AppContext, ContextError};
pub use models::{
    Course, CoursePatch, JwtCredential, Language, LanguagePatch, User, UserPatch, Word, WordPatch,
};
pub use queue::{JoinGroup, OperationError, OperationHandle, OperationQueue, QueueMode};
pub use storage::{
    Entity, MemoryStorage, SqliteStorage, Storage, StorageError, StorageResult, StorageTier,
    StorageType, TierResult,
};
pub use sync::{SyncEngine, SyncError, SyncFamily, SyncItem, SyncResult, SyncState};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
