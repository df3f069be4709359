//! Error taxonomy for the authentication service
//!
//! Every expected negative outcome is a variant here; only `Storage` and
//! `Internal` represent faults.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for authentication and session operations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown username, inactive account or wrong password; never says which
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token is invalid or expired")]
    TokenInvalidOrExpired,

    #[error("User not found")]
    SubjectNotFound,

    #[error("User account is inactive")]
    SubjectInactive,

    /// Reset token not found, already used or expired
    #[error("Invalid or expired reset token")]
    ResetTokenInvalid,

    #[error("Username already exists")]
    UsernameTaken,

    /// Todo missing or owned by someone else; never says which
    #[error("Todo not found")]
    TodoNotFound,

    /// Request payload rejected by input validation
    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Type alias for authentication results
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// HTTP status the routing layer answers with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenRevoked
            | AuthError::TokenInvalidOrExpired
            | AuthError::SubjectNotFound => StatusCode::UNAUTHORIZED,
            AuthError::SubjectInactive => StatusCode::FORBIDDEN,
            AuthError::ResetTokenInvalid => StatusCode::BAD_REQUEST,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::TodoNotFound => StatusCode::NOT_FOUND,
            AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::Storage(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AuthError {
    /// Whether the failed operation may be retried as-is
    ///
    /// Only connection-level storage failures qualify: the request never
    /// reached the database, so nothing was changed. A reset-token consume that
    /// failed any other way must not be replayed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Storage(e) if e.is_connection_level())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AuthError::Storage(e) => {
                error!(retryable = self.is_retryable(), "Storage failure: {}", e);
                "Internal server error".to_string()
            }
            AuthError::Internal(e) => {
                error!("Internal failure: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::TokenRevoked.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::SubjectInactive.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::ResetTokenInvalid.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::UsernameTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::TodoNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_carries_bearer_challenge() {
        let response = AuthError::TokenInvalidOrExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_only_connection_failures_are_retryable() {
        use sqlx::Error as SqlxError;

        assert!(AuthError::Storage(DatabaseError::Connection(SqlxError::PoolTimedOut)).is_retryable());
        assert!(AuthError::Storage(DatabaseError::Query(SqlxError::PoolClosed)).is_retryable());
        assert!(!AuthError::Storage(DatabaseError::Query(SqlxError::RowNotFound)).is_retryable());
        assert!(!AuthError::Storage(DatabaseError::Conflict("users_username_key".to_string())).is_retryable());
        assert!(!AuthError::ResetTokenInvalid.is_retryable());
        assert!(!AuthError::Internal("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_storage_details_are_not_exposed() {
        let err = AuthError::Storage(DatabaseError::Migration("secret detail".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
