use super::{ApiError, CourseApi, RequestDispatcher};
use crate::models::Course;

#[derive(Debug, Clone)]
pub struct CourseClient {
    dispatcher: RequestDispatcher,
}

impl CourseClient {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl CourseApi for CourseClient {
    async fn get_courses(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> Result<Vec<Course>, ApiError> {
        let path = format!("courses/userId/{}", user_id);
        self.dispatcher.get(&path, Some(access_token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::serve;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};

    #[tokio::test]
    async fn test_get_courses_for_user() {
        let app = Router::new().route(
            "/courses/userId/{id}",
            get(|Path(user_id): Path<i64>| async move {
                Json(vec![Course::new(10, user_id, 1, "English")])
            }),
        );
        let client = CourseClient::new(RequestDispatcher::new(serve(app).await));

        let courses = client.get_courses("tok", 42).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].user_id, 42);
    }
}
