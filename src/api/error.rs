//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::auth::{ApiAuthError, AuthErrorKind, LoginError};

/// API error type with automatic response conversion.
/// The message is sent to the client verbatim; internal detail belongs in logs.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    TooManyRequests(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Log `e` with context and return a 500 carrying only `public_msg`.
    pub fn internal_logged(context: &str, e: impl std::fmt::Display, public_msg: &str) -> Self {
        error!("{}: {}", context, e);
        Self::Internal(public_msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiAuthError> for ApiError {
    fn from(e: ApiAuthError) -> Self {
        let msg = e.message().to_string();
        match e.kind {
            AuthErrorKind::NotAuthenticated | AuthErrorKind::TokenRevoked => {
                ApiError::Unauthorized(msg)
            }
            AuthErrorKind::StorageUnavailable => ApiError::Internal(msg),
        }
    }
}

impl From<AuthErrorKind> for ApiError {
    fn from(kind: AuthErrorKind) -> Self {
        ApiAuthError::from(kind).into()
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::InvalidCredentials => AuthErrorKind::NotAuthenticated.into(),
            e => ApiError::internal_logged("Login failed", e, "failed to log in"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Conflict(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::Internal(msg) => msg,
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_keep_status_and_message() {
        let revoked = ApiError::from(AuthErrorKind::TokenRevoked);
        assert_eq!(revoked.status_code(), StatusCode::UNAUTHORIZED);
        assert!(matches!(revoked, ApiError::Unauthorized(ref m) if m == "revoked token"));

        let storage = ApiError::from(AuthErrorKind::StorageUnavailable);
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let generic = ApiError::from(AuthErrorKind::NotAuthenticated);
        assert!(matches!(generic, ApiError::Unauthorized(ref m) if m == "not authenticated"));
    }

    #[test]
    fn test_login_errors_have_their_own_message() {
        let rejected = ApiError::from(LoginError::InvalidCredentials);
        assert!(matches!(rejected, ApiError::Unauthorized(ref m) if m == "not authenticated"));

        let storage = ApiError::from(LoginError::Lookup(sqlx::Error::PoolClosed));
        assert!(matches!(storage, ApiError::Internal(ref m) if m == "failed to log in"));
    }
}
