use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Entity;

/// A user's course for one target language. Words belong to a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub user_id: i64,
    pub language_id: i64,
    pub language_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursePatch {
    pub language_id: i64,
    pub language_name: String,
}

impl Course {
    pub fn new(id: i64, user_id: i64, language_id: i64, language_name: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            language_id,
            language_name: language_name.into(),
            created_at: Utc::now(),
        }
    }
}

impl Entity for Course {
    type Id = i64;
    type Patch = CoursePatch;

    const KIND: &'static str = "course";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply(&mut self, patch: CoursePatch) {
        self.language_id = patch.language_id;
        self.language_name = patch.language_name;
    }
}
