use super::{ApiError, AuthRequest, AuthResponse, JwtApi, RequestDispatcher};

#[derive(Debug, Clone)]
pub struct JwtClient {
    dispatcher: RequestDispatcher,
}

impl JwtClient {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl JwtApi for JwtClient {
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResponse, ApiError> {
        self.dispatcher.post("auth", request, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::serve;
    use crate::models::{JwtCredential, User};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_authenticate() {
        let app = Router::new().route(
            "/auth",
            post(|Json(request): Json<AuthRequest>| async move {
                if request.password != "hunter2" {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(AuthResponse {
                    user: User::new(3, request.nickname),
                    jwt: JwtCredential::new("fresh", Utc::now() + Duration::hours(1)),
                }))
            }),
        );
        let client = JwtClient::new(RequestDispatcher::new(serve(app).await));

        let response = client
            .authenticate(&AuthRequest {
                nickname: "dima".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.user.nickname, "dima");
        assert_eq!(response.jwt.access_token, "fresh");
        assert!(!response.jwt.is_expired(Utc::now()));

        let err = client
            .authenticate(&AuthRequest {
                nickname: "dima".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
