//! Clients for the MyDictionary backend.
//!
//! Each remote family has a trait the sync engine and the CLI depend on, and
//! a `*Client` implementation that talks HTTP through a shared
//! [`RequestDispatcher`]. Transport, auth headers and decoding all live
//! behind these traits; callers only see `Result<_, ApiError>`.

mod account;
mod course;
mod dispatcher;
mod jwt;
mod language;
mod word;

pub use account::AccountClient;
pub use course::CourseClient;
pub use dispatcher::RequestDispatcher;
pub use jwt::JwtClient;
pub use language::LanguageClient;
pub use word::WordClient;

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::models::{Course, JwtCredential, Language, User, Word};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for 401/403 responses, i.e. the credential was rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

/// Credentials posted to the `auth` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub nickname: String,
    pub password: String,
}

/// A signed-in user together with their fresh credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub user: User,
    pub jwt: JwtCredential,
}

pub trait LanguageApi: Send + Sync {
    fn get_languages(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<Language>, ApiError>> + Send;
}

pub trait CourseApi: Send + Sync {
    fn get_courses(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Course>, ApiError>> + Send;
}

pub trait WordApi: Send + Sync {
    fn get_words(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Word>, ApiError>> + Send;
}

pub trait AccountApi: Send + Sync {
    fn delete_account(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

pub trait JwtApi: Send + Sync {
    fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;
}

#[cfg(test)]
pub(crate) mod testing {
    //! A throwaway HTTP server for exercising the clients.

    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::Status {
            status: 401,
            message: "expired".to_string(),
        };
        assert!(err.is_unauthorized());

        let err = ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_unauthorized());
        assert!(!ApiError::Decode("eof".to_string()).is_unauthorized());
    }

    #[test]
    fn test_auth_response_json() {
        let json = r#"{
            "user": {"id": 4, "nickname": "dima", "created_at": "2021-09-16T10:15:30Z"},
            "jwt": {"access_token": "tok", "expiration_date": "2021-09-17T10:15:30.000Z"}
        }"#;
        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.user.id, 4);
        assert_eq!(response.jwt.access_token, "tok");
    }
}
