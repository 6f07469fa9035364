//! Shared HTTP plumbing for the API clients.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ApiError;

/// Sends requests to one backend, attaching bearer credentials and turning
/// failures into [`ApiError`].
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    client: Client,
    base_url: String,
}

impl RequestDispatcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path)), access_token).await?;
        decode(response).await
    }

    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        access_token: Option<&str>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.send(request, access_token).await?;
        decode(response).await
    }

    /// Issues a DELETE; any success status counts, the body is ignored.
    pub async fn delete(&self, path: &str, access_token: Option<&str>) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(path)), access_token)
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        request: RequestBuilder,
        access_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let request = match access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        tracing::debug!(url = %response.url(), %status, "api response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pulls `message` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
