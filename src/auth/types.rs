//! Authentication user types.

use crate::jwt::TokenClaims;

/// User authenticated by a bearer access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Database user ID (decrypted from the token subject)
    pub user_id: i64,
}

/// Holder of a live, unrevoked refresh token.
/// Only good for minting access tokens.
#[derive(Debug, Clone)]
pub struct RefreshSession {
    /// Claims from the refresh token
    pub claims: TokenClaims,
    /// Database user ID
    pub user_id: i64,
}
