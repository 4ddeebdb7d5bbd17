//! Failure taxonomy for the user record service.
//!
//! Every core operation returns either a success value or one of these
//! typed failures. The HTTP boundary maps each variant to a status code
//! and a `{"status": "error", "message": ...}` envelope; internal detail
//! (I/O error strings) is logged, never sent to clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Errors surfaced by the session manager, record store and access
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No `Authorization` header, or a scheme other than `Bearer`.
    MissingCredential,
    /// A bearer token was presented but is malformed, tampered or expired.
    InvalidCredential,
    /// Login failed. Deliberately does not distinguish an unknown account
    /// from a wrong password.
    AuthenticationFailed,
    /// The token is valid but its subject does not own the target record.
    Forbidden,
    /// No record exists for the given id.
    NotFound,
    /// The account name is already taken.
    DuplicateAccount,
    /// The mail address is already registered.
    DuplicateMail,
    /// A required request field is missing or empty.
    InvalidInput(String),
    /// Persisting the collection to durable storage failed.
    StorageUnavailable(String),
    /// Unexpected internal failure (e.g. token signing). Detail is logged,
    /// not sent to the client.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "No credentials provided, please log in"),
            Self::InvalidCredential => write!(f, "Session is no longer valid, please log in again"),
            Self::AuthenticationFailed => write!(f, "Account or password is incorrect"),
            Self::Forbidden => write!(f, "Not allowed to modify this user"),
            Self::NotFound => write!(f, "User not found"),
            Self::DuplicateAccount => write!(f, "Account name is already taken"),
            Self::DuplicateMail => write!(f, "Mail address is already registered"),
            Self::InvalidInput(field) => write!(f, "Missing or empty field: {}", field),
            Self::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// HTTP status code this failure maps to at the boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredential | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::AuthenticationFailed => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateAccount | Self::DuplicateMail => StatusCode::BAD_REQUEST,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Storage failures get a generic message; the
    /// underlying I/O detail stays in the logs.
    fn client_message(&self) -> String {
        match self {
            Self::StorageUnavailable(_) => "Storage unavailable, please retry later".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::StorageUnavailable(detail) => tracing::error!("persistence failure: {}", detail),
            Self::Internal(detail) => tracing::error!("internal error: {}", detail),
            _ => {}
        }
        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.client_message(),
        }));
        (self.status_code(), body).into_response()
    }
}

/// Result type for core operations.
pub type ApiResult<T> = Result<T, ApiError>;
