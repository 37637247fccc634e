//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use helpdesk_shared::HelpdeskError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Access token required")]
    Unauthorized,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Access denied")]
    Forbidden,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("{0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Lifecycle violation: {0}")]
    Lifecycle(String),

    // Internal errors
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication. Missing credentials are 401; a presented but
            // invalid token is 403, matching the REST contract.
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            ApiError::InvalidToken => (StatusCode::FORBIDDEN, "INVALID_TOKEN", self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),

            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Resources
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Lifecycle(msg) => (StatusCode::CONFLICT, "LIFECYCLE_VIOLATION", msg.clone()),

            // Internal details go to operators via tracing, never to clients
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<HelpdeskError> for ApiError {
    fn from(err: HelpdeskError) -> Self {
        match err {
            HelpdeskError::Validation(msg) => ApiError::Validation(msg),
            HelpdeskError::NotFound(msg) => ApiError::NotFound(msg),
            HelpdeskError::Forbidden => ApiError::Forbidden,
            HelpdeskError::Conflict(msg) => ApiError::Conflict(msg),
            HelpdeskError::Lifecycle(msg) => ApiError::Lifecycle(msg),
            HelpdeskError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::InvalidToken, StatusCode::FORBIDDEN),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (
                ApiError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::NotFound("ticket x not found".into()),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::Conflict("taken".into()), StatusCode::CONFLICT),
            (ApiError::Lifecycle("ended".into()), StatusCode::CONFLICT),
            (ApiError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err: ApiError = HelpdeskError::Internal("connection pool exhausted".into()).into();
        assert_eq!(err.to_string(), "Internal server error");
    }
}
