//! JSON body extractor that runs the body's validator steps before the handler sees it.

use crate::error::AppError;
use crate::service::validation::Validate;
use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

/// Deserialized and validated body. Any failure short-circuits with a 400 envelope.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        body.validate()?;
        Ok(ValidatedJson(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::validation::{min_length, required};
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct Note {
        title: String,
    }

    impl Validate for Note {
        fn validate(&self) -> Result<(), AppError> {
            required("title", &self.title)?;
            min_length("title", &self.title, 3)
        }
    }

    fn json_request(body: &'static str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/notes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_passes_through() {
        let ValidatedJson(note) = ValidatedJson::<Note>::from_request(json_request(r#"{"title":"hello"}"#), &())
            .await
            .unwrap();
        assert_eq!(note.title, "hello");
    }

    #[tokio::test]
    async fn first_failing_step_short_circuits() {
        let err = ValidatedJson::<Note>::from_request(json_request(r#"{"title":""}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "title is required");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let err = ValidatedJson::<Note>::from_request(json_request("{"), &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
