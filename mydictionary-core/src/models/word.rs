use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::Entity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub language_id: i64,
    pub text: String,
    pub description: String,
    pub language_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New text and description for an existing word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPatch {
    pub text: String,
    pub description: String,
}

impl Word {
    pub fn new(
        id: i64,
        course_id: i64,
        text: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: 0,
            course_id,
            language_id: 0,
            text: text.into(),
            description: description.into(),
            language_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_language(mut self, language_id: i64, language_name: impl Into<String>) -> Self {
        self.language_id = language_id;
        self.language_name = language_name.into();
        self
    }
}

impl Entity for Word {
    type Id = i64;
    type Patch = WordPatch;

    const KIND: &'static str = "word";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply(&mut self, patch: WordPatch) {
        self.text = patch.text;
        self.description = patch.description;
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.text)?;
        writeln!(f, "{}", "=".repeat(self.text.chars().count()))?;

        if !self.language_name.is_empty() {
            writeln!(f, "Language: {}", self.language_name)?;
        }
        writeln!(f, "Course: {}", self.course_id)?;

        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }

        Ok(())
    }
}
