//! Row mappings between the entity models and their SQLite tables.
//!
//! Timestamps are stored as RFC 3339 text; a value that fails to parse is
//! reported as a corrupt row rather than silently replaced.

use chrono::{DateTime, Utc};

use super::sqlite::{SqliteEntity, SqliteQuery};
use super::{Entity, StorageError, StorageResult};
use crate::models::{Course, JwtCredential, Language, User, Word};

fn parse_timestamp<E: Entity>(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            kind: E::KIND,
            message: format!("invalid timestamp '{}': {}", value, e),
        })
}

#[derive(sqlx::FromRow)]
pub struct LanguageRow {
    id: i64,
    name: String,
}

impl SqliteEntity for Language {
    type Row = LanguageRow;

    const TABLE: &'static str = "languages";
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn from_row(row: LanguageRow) -> StorageResult<Self> {
        Ok(Language {
            id: row.id,
            name: row.name,
        })
    }

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.id).bind(&self.name)
    }
}

#[derive(sqlx::FromRow)]
pub struct CourseRow {
    id: i64,
    user_id: i64,
    language_id: i64,
    language_name: String,
    created_at: String,
}

impl SqliteEntity for Course {
    type Row = CourseRow;

    const TABLE: &'static str = "courses";
    const COLUMNS: &'static [&'static str] =
        &["id", "user_id", "language_id", "language_name", "created_at"];

    fn from_row(row: CourseRow) -> StorageResult<Self> {
        Ok(Course {
            id: row.id,
            user_id: row.user_id,
            language_id: row.language_id,
            language_name: row.language_name,
            created_at: parse_timestamp::<Course>(&row.created_at)?,
        })
    }

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id)
            .bind(self.user_id)
            .bind(self.language_id)
            .bind(&self.language_name)
            .bind(self.created_at.to_rfc3339())
    }
}

#[derive(sqlx::FromRow)]
pub struct WordRow {
    id: i64,
    user_id: i64,
    course_id: i64,
    language_id: i64,
    text: String,
    description: String,
    language_name: String,
    created_at: String,
    updated_at: String,
}

impl SqliteEntity for Word {
    type Row = WordRow;

    const TABLE: &'static str = "words";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "course_id",
        "language_id",
        "text",
        "description",
        "language_name",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: WordRow) -> StorageResult<Self> {
        Ok(Word {
            id: row.id,
            user_id: row.user_id,
            course_id: row.course_id,
            language_id: row.language_id,
            text: row.text,
            description: row.description,
            language_name: row.language_name,
            created_at: parse_timestamp::<Word>(&row.created_at)?,
            updated_at: parse_timestamp::<Word>(&row.updated_at)?,
        })
    }

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id)
            .bind(self.user_id)
            .bind(self.course_id)
            .bind(self.language_id)
            .bind(&self.text)
            .bind(&self.description)
            .bind(&self.language_name)
            .bind(self.created_at.to_rfc3339())
            .bind(self.updated_at.to_rfc3339())
    }
}

#[derive(sqlx::FromRow)]
pub struct UserRow {
    id: i64,
    nickname: String,
    created_at: String,
}

impl SqliteEntity for User {
    type Row = UserRow;

    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "nickname", "created_at"];

    fn from_row(row: UserRow) -> StorageResult<Self> {
        Ok(User {
            id: row.id,
            nickname: row.nickname,
            created_at: parse_timestamp::<User>(&row.created_at)?,
        })
    }

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.nickname)
            .bind(self.created_at.to_rfc3339())
    }
}

// The access token doubles as the row key.
#[derive(sqlx::FromRow)]
pub struct JwtRow {
    id: String,
    expiration_date: String,
}

impl SqliteEntity for JwtCredential {
    type Row = JwtRow;

    const TABLE: &'static str = "jwts";
    const COLUMNS: &'static [&'static str] = &["id", "expiration_date"];

    fn from_row(row: JwtRow) -> StorageResult<Self> {
        Ok(JwtCredential {
            access_token: row.id,
            expiration_date: row.expiration_date,
        })
    }

    fn bind_values<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(&self.access_token).bind(&self.expiration_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_roundtrip() {
        let now = Utc::now();
        let parsed = parse_timestamp::<Word>(&now.to_rfc3339()).unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp::<Course>("yesterday").unwrap_err();
        match err {
            StorageError::Corrupt { kind, .. } => assert_eq!(kind, "course"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_columns_start_with_id() {
        assert_eq!(Language::COLUMNS[0], "id");
        assert_eq!(Course::COLUMNS[0], "id");
        assert_eq!(Word::COLUMNS[0], "id");
        assert_eq!(User::COLUMNS[0], "id");
        assert_eq!(JwtCredential::COLUMNS[0], "id");
    }

    #[test]
    fn test_word_row_maps_all_fields() {
        let now = Utc::now().to_rfc3339();
        let row = WordRow {
            id: 1,
            user_id: 2,
            course_id: 3,
            language_id: 4,
            text: "Flank".to_string(),
            description: "the side of something".to_string(),
            language_name: "English".to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        let word = Word::from_row(row).unwrap();
        assert_eq!(word.id, 1);
        assert_eq!(word.course_id, 3);
        assert_eq!(word.language_name, "English");
    }
}
