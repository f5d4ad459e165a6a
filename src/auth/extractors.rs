//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, error};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::{AuthenticatedUser, RefreshSession};
use crate::jwt::TokenClaims;

/// Pull the token out of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Read and verify the refresh cookie without consulting the revocation store.
fn refresh_claims<S: HasAuthBackend>(
    parts: &Parts,
    state: &S,
) -> Result<TokenClaims, AuthErrorKind> {
    let token = state
        .cookies()
        .read(&parts.headers)
        .ok_or(AuthErrorKind::NotAuthenticated)?;

    state
        .tokens()
        .verify_refresh_token(token)
        .ok_or(AuthErrorKind::NotAuthenticated)
}

/// Full refresh gate: verify, check revocation, then decrypt the subject.
async fn authenticate_refresh<S>(
    parts: &Parts,
    state: &S,
) -> Result<RefreshSession, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let claims = refresh_claims(parts, state)?;

    let revoked = state
        .db()
        .revocations()
        .is_revoked(&claims)
        .await
        .map_err(|e| {
            error!("Failed to check token revocation: {}", e);
            AuthErrorKind::StorageUnavailable
        })?;

    if revoked {
        debug!(jti = %claims.jti, "Revoked refresh token presented");
        return Err(AuthErrorKind::TokenRevoked);
    }

    let user_id = state.tokens().decrypt_subject(&claims).map_err(|e| {
        debug!(reason = %e, "Refresh token subject rejected");
        AuthErrorKind::NotAuthenticated
    })?;

    let exists = state
        .db()
        .users()
        .get_by_id(user_id)
        .await
        .map_err(|e| {
            error!("Failed to get user: {}", e);
            AuthErrorKind::StorageUnavailable
        })?
        .is_some();

    if !exists {
        debug!(user_id, "Refresh token subject no longer exists");
        return Err(AuthErrorKind::NotAuthenticated);
    }

    Ok(RefreshSession { claims, user_id })
}

/// Extractor for endpoints that require a bearer access token.
/// Stateless: never touches the database.
pub struct BearerAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthErrorKind::NotAuthenticated)?;

        let user_id = state
            .tokens()
            .verify_access_token(token)
            .ok_or(AuthErrorKind::NotAuthenticated)?;

        Ok(BearerAuth(AuthenticatedUser { user_id }))
    }
}

/// Extractor for minting access tokens from the refresh cookie.
/// Rejects revoked tokens and fails closed if revocation cannot be checked.
pub struct RefreshAuth(pub RefreshSession);

impl<S> FromRequestParts<S> for RefreshAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_refresh(parts, state)
            .await
            .map(RefreshAuth)
            .map_err(ApiAuthError::from)
    }
}

/// Extractor yielding the verified claims of the refresh cookie, revoked or not.
/// Used by logout, which reports double revocation itself.
pub struct RefreshCookie(pub TokenClaims);

impl<S> FromRequestParts<S> for RefreshCookie
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        refresh_claims(parts, state)
            .map(RefreshCookie)
            .map_err(ApiAuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_authorization(value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_bearer_token() {
        let parts = parts_with_authorization("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));

        let parts = parts_with_authorization("bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&parts_with_authorization("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&parts_with_authorization("Bearer ")), None);
        assert_eq!(bearer_token(&parts_with_authorization("abc.def.ghi")), None);
    }
}
