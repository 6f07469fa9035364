mod account;
mod auth;
mod config_cmd;
mod sync_cmd;
mod word;

pub use account::AccountCommand;
pub use auth::{LoginCommand, LogoutCommand};
pub use config_cmd::ConfigCommand;
pub use sync_cmd::SyncCommand;
pub use word::WordCommand;

use chrono::Utc;
use clap::ValueEnum;
use mydictionary_core::storage::collect_results;
use mydictionary_core::{
    ApiError, AppContext, JwtCredential, StorageError, StorageType, SyncError, TierResult, User,
};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Errors from command handlers
#[derive(Debug)]
pub enum CommandError {
    /// No stored credential
    NotLoggedIn,
    /// Stored credential is past its expiration date
    SessionExpired,
    /// `--storage none` where a value is required
    NoStorageSelected,
    Storage(StorageError),
    Api(ApiError),
    Sync(SyncError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotLoggedIn => write!(f, "Not logged in. Run 'mydict login' first."),
            CommandError::SessionExpired => {
                write!(f, "Session expired. Run 'mydict login' again.")
            }
            CommandError::NoStorageSelected => {
                write!(f, "No storage tier selected. Use --storage memory, durable or all.")
            }
            CommandError::Storage(e) => write!(f, "Storage error: {}", e),
            CommandError::Api(e) => write!(f, "API error: {}", e),
            CommandError::Sync(e) => write!(f, "Sync error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Storage(e) => Some(e),
            CommandError::Api(e) => Some(e),
            CommandError::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        CommandError::Storage(e)
    }
}

impl From<ApiError> for CommandError {
    fn from(e: ApiError) -> Self {
        CommandError::Api(e)
    }
}

impl From<SyncError> for CommandError {
    fn from(e: SyncError) -> Self {
        CommandError::Sync(e)
    }
}

/// The signed-in user and their credential, as stored locally.
pub struct Session {
    pub user: User,
    pub jwt: JwtCredential,
}

/// Loads the stored session from the durable tier, rejecting an expired
/// credential.
pub async fn current_session(context: &AppContext) -> Result<Session, CommandError> {
    let users = first(context.users.read_all(StorageType::Durable).await)?;
    let jwts = first(context.jwts.read_all(StorageType::Durable).await)?;

    let user = users.into_iter().next().ok_or(CommandError::NotLoggedIn)?;
    let jwt = jwts.into_iter().next().ok_or(CommandError::NotLoggedIn)?;

    if jwt.is_expired(Utc::now()) {
        return Err(CommandError::SessionExpired);
    }

    Ok(Session { user, jwt })
}

/// The first tier's value, or the first tier failure.
pub fn first<T>(results: Vec<TierResult<T>>) -> Result<T, CommandError> {
    collect_results(results)?
        .into_iter()
        .next()
        .ok_or(CommandError::NoStorageSelected)
}

/// Prints one line per tier failure; returns true if every tier succeeded.
pub fn report_failures<T>(action: &str, results: &[TierResult<T>]) -> bool {
    let mut all_ok = true;
    for result in results {
        if let Err(e) = &result.result {
            eprintln!("  ✗ {} failed in {} storage: {}", action, result.storage_type, e);
            all_ok = false;
        }
    }
    all_ok
}
