use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Entity;

/// Expiration timestamp layout used by the backend, always UTC.
pub const JWT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Bearer credential issued by the backend.
///
/// Keyed by its access token. Updating a credential replaces it wholesale,
/// so the key itself may change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtCredential {
    pub access_token: String,
    pub expiration_date: String,
}

impl JwtCredential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expiration_date: expires_at.format(JWT_DATE_FORMAT).to_string(),
        }
    }

    /// Parsed expiration, or `None` if the backend sent a malformed date.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.expiration_date, JWT_DATE_FORMAT)
            .ok()
            .map(|dt| dt.and_utc())
    }

    /// A credential with an unparseable expiration is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }
}

impl Entity for JwtCredential {
    type Id = String;
    type Patch = JwtCredential;

    const KIND: &'static str = "jwt";

    fn id(&self) -> String {
        self.access_token.clone()
    }

    fn apply(&mut self, patch: JwtCredential) {
        *self = patch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_expires_at_parses_backend_format() {
        let jwt = JwtCredential {
            access_token: "token".to_string(),
            expiration_date: "2021-09-16T10:15:30.250Z".to_string(),
        };
        let expected = Utc.with_ymd_and_hms(2021, 9, 16, 10, 15, 30).unwrap()
            + Duration::milliseconds(250);
        assert_eq!(jwt.expires_at(), Some(expected));
    }

    #[test]
    fn test_new_formats_expiration() {
        let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let jwt = JwtCredential::new("abc", expires);
        assert_eq!(jwt.expiration_date, "2030-01-02T03:04:05.000Z");
        assert_eq!(jwt.expires_at(), Some(expires));
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(!JwtCredential::new("a", now + Duration::hours(1)).is_expired(now));
        assert!(JwtCredential::new("b", now - Duration::seconds(1)).is_expired(now));
    }

    #[test]
    fn test_malformed_expiration_is_expired() {
        let jwt = JwtCredential {
            access_token: "token".to_string(),
            expiration_date: "next tuesday".to_string(),
        };
        assert!(jwt.expires_at().is_none());
        assert!(jwt.is_expired(Utc::now()));
    }

    #[test]
    fn test_json_field_names() {
        let json = r#"{"access_token":"t","expiration_date":"2021-09-16T10:15:30.000Z"}"#;
        let jwt: JwtCredential = serde_json::from_str(json).unwrap();
        assert_eq!(jwt.access_token, "t");
        assert_eq!(jwt.id(), "t");
    }

    #[test]
    fn test_apply_replaces_credential() {
        let mut jwt = JwtCredential::new("old", Utc::now());
        let replacement = JwtCredential::new("new", Utc::now() + Duration::days(1));
        jwt.apply(replacement.clone());
        assert_eq!(jwt, replacement);
    }
}
