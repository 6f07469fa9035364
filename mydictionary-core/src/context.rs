//! Explicit dependency container.
//!
//! Built once at startup and handed to whatever needs storage or API
//! access. Nothing in the crate reaches for ambient global state.

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::api::{
    AccountClient, CourseClient, JwtClient, LanguageClient, RequestDispatcher, WordClient,
};
use crate::models::{Course, JwtCredential, Language, User, Word};
use crate::storage::{init_db, Storage, StorageError};
use crate::sync::SyncEngine;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid api url '{url}': {message}")]
    InvalidApiUrl { url: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type DefaultSyncEngine = SyncEngine<LanguageClient, CourseClient, WordClient>;

pub struct AppContext {
    pub pool: SqlitePool,
    pub dispatcher: RequestDispatcher,

    pub languages: Storage<Language>,
    pub courses: Storage<Course>,
    pub words: Storage<Word>,
    pub users: Storage<User>,
    pub jwts: Storage<JwtCredential>,

    pub language_api: Arc<LanguageClient>,
    pub course_api: Arc<CourseClient>,
    pub word_api: Arc<WordClient>,
    pub account_api: AccountClient,
    pub jwt_api: JwtClient,
}

impl AppContext {
    /// Opens the database at `database_path` and wires every component to it
    /// and to the backend at `api_url`.
    pub async fn open(database_path: &Path, api_url: &str) -> Result<Self, ContextError> {
        reqwest::Url::parse(api_url).map_err(|e| ContextError::InvalidApiUrl {
            url: api_url.to_string(),
            message: e.to_string(),
        })?;

        let pool = init_db(database_path).await?;
        Ok(Self::with_pool(pool, RequestDispatcher::new(api_url)))
    }

    pub fn with_pool(pool: SqlitePool, dispatcher: RequestDispatcher) -> Self {
        Self {
            languages: Storage::new(pool.clone()),
            courses: Storage::new(pool.clone()),
            words: Storage::new(pool.clone()),
            users: Storage::new(pool.clone()),
            jwts: Storage::new(pool.clone()),
            language_api: Arc::new(LanguageClient::new(dispatcher.clone())),
            course_api: Arc::new(CourseClient::new(dispatcher.clone())),
            word_api: Arc::new(WordClient::new(dispatcher.clone())),
            account_api: AccountClient::new(dispatcher.clone()),
            jwt_api: JwtClient::new(dispatcher.clone()),
            dispatcher,
            pool,
        }
    }

    /// A sync engine bound to this context's clients and storages.
    pub fn sync_engine(&self) -> DefaultSyncEngine {
        SyncEngine::new(
            self.language_api.clone(),
            self.course_api.clone(),
            self.word_api.clone(),
            self.languages.clone(),
            self.courses.clone(),
            self.words.clone(),
        )
    }

    /// Loads every family's durable records into its memory tier.
    pub async fn warm_memory(&self) -> Result<(), ContextError> {
        self.languages.warm_memory().await?;
        self.courses.warm_memory().await?;
        self.words.warm_memory().await?;
        self.users.warm_memory().await?;
        self.jwts.warm_memory().await?;
        Ok(())
    }
}
