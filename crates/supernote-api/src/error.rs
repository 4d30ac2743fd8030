//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": "<message>"}`. Client-class
//! errors carry their message through; server-class errors are logged with
//! their cause and answered with a generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use supernote_core::Error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    NotImplemented(String),
    /// The store did not answer before the deadline.
    Timeout(Error),
    /// The store is shutting down or the request was abandoned.
    Unavailable(Error),
    Internal(Error),
}

impl ApiError {
    pub fn invalid_note_id() -> Self {
        ApiError::BadRequest("Invalid note ID".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict("Note already exists".to_string());
        }
        match err {
            Error::NoteNotFound(_) => ApiError::NotFound("Note not found".to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Timeout(_) => ApiError::Timeout(err),
            Error::Cancelled(_) => ApiError::Unavailable(err),
            other => ApiError::Internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge(rejection.body_text());
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::NotImplemented(msg) => msg,
            ApiError::Timeout(err) => {
                warn!(error = %err, "Store deadline exceeded");
                "Request timed out".to_string()
            }
            ApiError::Unavailable(err) => {
                warn!(error = %err, "Store unavailable");
                "Service unavailable".to_string()
            }
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_domain_errors_map_to_status() {
        let cases = [
            (Error::NoteNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                Error::InvalidInput("title is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (Error::Timeout("slow".into()), StatusCode::GATEWAY_TIMEOUT),
            (
                Error::Conflict("duplicate key".into()),
                StatusCode::CONFLICT,
            ),
            (
                Error::Cancelled("closed".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Serialization("bad metadata".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_not_found_message_is_fixed() {
        match ApiError::from(Error::NoteNotFound(Uuid::new_v4())) {
            ApiError::NotFound(msg) => assert_eq!(msg, "Note not found"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
