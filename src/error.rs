use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request failure taxonomy. Every variant turns into an HTTP status plus a
/// JSON body carrying a `message` field.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Signup with an email that already has an account.
    #[error("User already exists")]
    DuplicateUser,

    /// Unknown email or wrong password; the two are never distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No session cookie, or one that fails verification.
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// Collaborator failure (database, hashing, signing, filesystem). The
    /// cause is logged server-side; the client only sees a generic message.
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

/// Result alias used by handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!(error = %err, "request failed");
        }

        let status = match &self {
            ApiError::Validation(_) | ApiError::DuplicateUser | ApiError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}
