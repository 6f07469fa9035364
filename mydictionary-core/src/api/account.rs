use super::{AccountApi, ApiError, RequestDispatcher};

#[derive(Debug, Clone)]
pub struct AccountClient {
    dispatcher: RequestDispatcher,
}

impl AccountClient {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl AccountApi for AccountClient {
    async fn delete_account(&self, access_token: &str, user_id: i64) -> Result<(), ApiError> {
        let path = format!("deleteAccount/userId/{}", user_id);
        self.dispatcher.delete(&path, Some(access_token)).await
    }
}
