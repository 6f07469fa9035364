use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Entity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPatch {
    pub nickname: String,
}

impl User {
    pub fn new(id: i64, nickname: impl Into<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for User {
    type Id = i64;
    type Patch = UserPatch;

    const KIND: &'static str = "user";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply(&mut self, patch: UserPatch) {
        self.nickname = patch.nickname;
    }
}
