use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::Entity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePatch {
    pub name: String,
}

impl Language {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Entity for Language {
    type Id = i64;
    type Patch = LanguagePatch;

    const KIND: &'static str = "language";

    fn id(&self) -> i64 {
        self.id
    }

    fn apply(&mut self, patch: LanguagePatch) {
        self.name = patch.name;
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}
