use super::{ApiError, LanguageApi, RequestDispatcher};
use crate::models::Language;

#[derive(Debug, Clone)]
pub struct LanguageClient {
    dispatcher: RequestDispatcher,
}

impl LanguageClient {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl LanguageApi for LanguageClient {
    async fn get_languages(&self, access_token: &str) -> Result<Vec<Language>, ApiError> {
        self.dispatcher.get("languages", Some(access_token)).await
    }
}
