//! API error type and its HTTP mapping.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use derive_more::{Display, Error, From};
use serde::Serialize;
use strictly_digits::{GameError, GameErrorKind};
use tracing::{error, warn};

use crate::db::DbError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Display, Error, From)]
pub enum ApiError {
    /// A game rule or storage error from the service.
    #[display("{}", _0)]
    #[from]
    Game(GameError),

    /// A database error outside the game core (profiles).
    #[display("{}", _0)]
    #[from]
    Db(DbError),

    /// Missing or unknown player identity.
    #[display("Unauthorized: {}", _0)]
    Unauthorized(#[error(not(source))] String),

    /// Malformed request.
    #[display("Bad request: {}", _0)]
    BadRequest(#[error(not(source))] String),

    /// The resource already exists.
    #[display("Conflict: {}", _0)]
    Conflict(#[error(not(source))] String),

    /// Unexpected server-side failure.
    #[display("Internal error: {}", _0)]
    Internal(#[error(not(source))] String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Game(err) => match err.kind() {
                GameErrorKind::InvalidFormat(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_FORMAT")
                }
                GameErrorKind::SessionTerminated(_) => (StatusCode::CONFLICT, "SESSION_TERMINATED"),
                GameErrorKind::NoActiveSession(_) => (StatusCode::NOT_FOUND, "NO_ACTIVE_SESSION"),
                GameErrorKind::StorageFailure(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE")
                }
            },
            ApiError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Game errors carry source locations; clients only see the kind.
        let message = match &self {
            ApiError::Game(err) => err.kind().to_string(),
            ApiError::Db(_) => "storage failure".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(error = %self, %status, "Request failed");
        } else {
            warn!(error = %self, %status, "Request rejected");
        }

        let body = ErrorResponse {
            error: message,
            code,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_wrapped_errors_keep_their_source() {
        let err = ApiError::from(GameError::new(GameErrorKind::NoActiveSession(
            strictly_digits::UserId::new(3),
        )));
        assert!(err.source().is_some());
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "NO_ACTIVE_SESSION"));

        let err = ApiError::from(DbError::new("disk full"));
        assert!(err.source().is_some());
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message_variants_have_no_source() {
        let err = ApiError::BadRequest("empty body".to_string());
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "Bad request: empty body");
    }
}
