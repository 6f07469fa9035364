use super::{ApiError, RequestDispatcher, WordApi};
use crate::models::Word;

#[derive(Debug, Clone)]
pub struct WordClient {
    dispatcher: RequestDispatcher,
}

impl WordClient {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl WordApi for WordClient {
    async fn get_words(&self, access_token: &str, user_id: i64) -> Result<Vec<Word>, ApiError> {
        let path = format!("words/userId/{}", user_id);
        self.dispatcher.get(&path, Some(access_token)).await
    }
}
