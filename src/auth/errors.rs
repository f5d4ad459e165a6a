//! Authentication error types.
//!
//! Every credential failure maps to the same generic 401 so the response
//! never reveals which check failed. Only revocation and storage failures
//! carry their own message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Outcome of a failed pass through the authentication gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Missing, malformed, forged, expired or wrong-issuer credential,
    /// or a bad username/password
    NotAuthenticated,
    /// Refresh token found in the revocation store
    TokenRevoked,
    /// The store could not answer; fail closed
    StorageUnavailable,
}

/// API authentication error rendered as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
}

impl ApiAuthError {
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated | AuthErrorKind::TokenRevoked => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "not authenticated",
            AuthErrorKind::TokenRevoked => "revoked token",
            AuthErrorKind::StorageUnavailable => "failed to verify token",
        }
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
