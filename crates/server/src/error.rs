//! Application error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use whichdoctor_core::ValidationError;

pub const RATE_LIMITED_MESSAGE: &str = "Please wait a moment before submitting another analysis";
const INTERNAL_MESSAGE: &str = "Internal server error. Please try again later.";
const INVALID_JSON_MESSAGE: &str = "Invalid JSON payload";

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    RateLimited,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE.to_string()),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
        AppError::BadRequest(INVALID_JSON_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value as JsonValue;
    use whichdoctor_core::FieldViolation;

    async fn body_of(err: AppError) -> (StatusCode, JsonValue) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_becomes_400_with_all_violations() {
        let err = ValidationError {
            violations: vec![
                FieldViolation::new("symptoms", "must contain at least one symptom"),
                FieldViolation::new("age_range", "must be a string"),
            ],
        };
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "symptoms: must contain at least one symptom; age_range: must be a string"
        );
    }

    #[tokio::test]
    async fn rate_limit_uses_fixed_message() {
        let (status, body) = body_of(AppError::RateLimited).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], RATE_LIMITED_MESSAGE);
    }

    #[tokio::test]
    async fn internal_detail_is_not_exposed() {
        let (status, body) = body_of(AppError::Internal("db exploded at row 7".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_MESSAGE);
    }
}
