//! League error types with HTTP status code mapping.
//!
//! [`LeagueError`] is the central error type for the engine. Each variant
//! maps to a specific HTTP status code and structured JSON error response,
//! so command callers render a message instead of crashing the host.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: pick exactly one learning language",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`LeagueError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum LeagueError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Participant is unknown or has never joined.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// No round is currently in the ACTIVE state.
    #[error("no active round")]
    NoActiveRound,

    /// A command needed a completed round but none exists yet.
    #[error("no completed round")]
    NoCompletedRound,

    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeagueError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::UserNotFound(_) => 2001,
            Self::NoActiveRound => 2002,
            Self::NoCompletedRound => 2003,
            Self::Store(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::NoActiveRound | Self::NoCompletedRound => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for LeagueError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl IntoResponse for LeagueError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_category_ranges() {
        assert_eq!(LeagueError::InvalidRequest(String::new()).error_code(), 1001);
        assert_eq!(LeagueError::UserNotFound(UserId::new(1)).error_code(), 2001);
        assert_eq!(LeagueError::NoActiveRound.error_code(), 2002);
        assert_eq!(LeagueError::Store(String::new()).error_code(), 3001);
    }

    #[test]
    fn status_codes_match_variants() {
        assert_eq!(
            LeagueError::InvalidRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LeagueError::UserNotFound(UserId::new(1)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(LeagueError::NoActiveRound.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            LeagueError::Internal(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn display_includes_context() {
        let err = LeagueError::UserNotFound(UserId::new(42));
        assert_eq!(err.to_string(), "user not found: 42");
    }
}
