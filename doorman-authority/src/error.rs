//! Authority error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy of the session authority.
///
/// `StoreUnavailable` is the only retryable kind; everything else is
/// terminal for the request. The HTTP mapping collapses
/// `InvalidCredential`, `AccountInactive` and `NotFound` into one
/// generic message so callers cannot enumerate accounts; internal logs
/// keep the kinds distinct.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("Delegated identity has no linked account")]
    AccountNotProvisioned,

    #[error("Account is disabled or deleted")]
    AccountInactive,

    #[error("Malformed bearer artifact")]
    Malformed,

    #[error("Session expired")]
    Expired,

    #[error("Session revoked")]
    Revoked,

    #[error("Session or account not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Password too short (minimum 8 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 80 characters)")]
    PasswordTooLong,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether a caller may retry the failed request as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable(_))
    }
}

impl From<doorman_core::Error> for AuthError {
    fn from(_err: doorman_core::Error) -> Self {
        // every structural artifact failure presents as Malformed;
        // signing-side failures are mapped to Internal at the call site
        AuthError::Malformed
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::InvalidCredential | AuthError::AccountInactive | AuthError::NotFound => {
                tracing::warn!(kind = ?self, "authentication rejected");
                (StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            AuthError::AccountNotProvisioned => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            AuthError::Malformed | AuthError::Expired | AuthError::Revoked => {
                tracing::debug!(kind = ?self, "session rejected");
                (StatusCode::UNAUTHORIZED, "Please sign in again")
            }
            AuthError::StoreUnavailable(msg) => {
                tracing::error!("store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
            }
            AuthError::EmailTaken => (StatusCode::CONFLICT, "Email already registered"),
            AuthError::PasswordTooShort => {
                (StatusCode::BAD_REQUEST, "Password too short (minimum 8 characters)")
            }
            AuthError::PasswordTooLong => {
                (StatusCode::BAD_REQUEST, "Password too long (maximum 80 characters)")
            }
            AuthError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
