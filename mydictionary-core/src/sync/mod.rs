//! Pulls remote state into both storage tiers.
//!
//! A run walks the entity families in dependency order (languages, then
//! courses, then words). Each family fetches from its API, clears its local
//! copy and re-creates every record in every tier. Outcomes are reported
//! per family, once, after the whole run has finished.

mod engine;

pub use engine::SyncEngine;

use std::fmt;
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Parameters for one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub access_token: String,
    pub user_id: i64,
}

impl SyncItem {
    pub fn new(access_token: impl Into<String>, user_id: i64) -> Self {
        Self {
            access_token: access_token.into(),
            user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncFamily {
    Language,
    Course,
    Word,
}

impl SyncFamily {
    /// Every family, in the order a run processes them.
    pub const ALL: [SyncFamily; 3] = [SyncFamily::Language, SyncFamily::Course, SyncFamily::Word];
}

impl fmt::Display for SyncFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncFamily::Language => write!(f, "language"),
            SyncFamily::Course => write!(f, "course"),
            SyncFamily::Word => write!(f, "word"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("a sync run is already in progress")]
    AlreadyRunning,

    #[error("sync run ended without reporting every family")]
    Abandoned,
}

/// Outcome for one family. On success, the number of records persisted.
#[derive(Debug)]
pub struct SyncResult {
    pub family: SyncFamily,
    pub result: Result<usize, SyncError>,
}

impl SyncResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(count) => write!(f, "{}: synced {} record(s)", self.family, count),
            Err(e) => write!(f, "{}: failed: {}", self.family, e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// Families not yet finished in the current run.
    Running { pending: Vec<SyncFamily> },
    Completed,
}

impl SyncState {
    pub fn is_running(&self) -> bool {
        matches!(self, SyncState::Running { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_order() {
        assert_eq!(
            SyncFamily::ALL,
            [SyncFamily::Language, SyncFamily::Course, SyncFamily::Word]
        );
    }

    #[test]
    fn test_result_display() {
        let ok = SyncResult {
            family: SyncFamily::Word,
            result: Ok(12),
        };
        assert_eq!(ok.to_string(), "word: synced 12 record(s)");

        let failed = SyncResult {
            family: SyncFamily::Course,
            result: Err(SyncError::Storage(StorageError::Cancelled)),
        };
        assert_eq!(
            failed.to_string(),
            "course: failed: storage error: operation cancelled before execution"
        );
    }
}
