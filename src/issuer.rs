//! Access and refresh token issuance.
//!
//! Access tokens are short-lived and stateless; they are never checked against
//! the revocation store. Refresh tokens are long-lived, signed with their own
//! secret, and are only trusted after a revocation check, so their subject is
//! left encrypted by [`TokenIssuer::verify_refresh_token`].

use crate::jwt::{JwtError, TokenClaims, TokenCodec};
use crate::subject::{SubjectCodec, SubjectError};

/// Default access token lifespan: 15 minutes
pub const DEFAULT_ACCESS_LIFESPAN_SECS: u64 = 15 * 60;

/// Default refresh token lifespan: 2 weeks
pub const DEFAULT_REFRESH_LIFESPAN_SECS: u64 = 14 * 24 * 60 * 60;

/// Longest configurable lifespan for either token kind: 10 years
pub const MAX_LIFESPAN_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Claims that were signed
    pub claims: TokenClaims,
    /// Token duration in seconds
    pub lifespan: u64,
}

/// Mints and verifies both token kinds for one deployment.
#[derive(Clone)]
pub struct TokenIssuer {
    issuer: String,
    subjects: SubjectCodec,
    access: TokenCodec,
    access_lifespan: u64,
    refresh: TokenCodec,
    refresh_lifespan: u64,
}

impl TokenIssuer {
    pub fn new(
        issuer: impl Into<String>,
        subject_secret: &[u8],
        access_secret: &[u8],
        access_lifespan: u64,
        refresh_secret: &[u8],
        refresh_lifespan: u64,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            subjects: SubjectCodec::new(subject_secret),
            access: TokenCodec::new(access_secret),
            access_lifespan,
            refresh: TokenCodec::new(refresh_secret),
            refresh_lifespan,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn access_lifespan(&self) -> u64 {
        self.access_lifespan
    }

    pub fn refresh_lifespan(&self) -> u64 {
        self.refresh_lifespan
    }

    fn issue(
        &self,
        codec: &TokenCodec,
        user_id: i64,
        lifespan: u64,
    ) -> Result<IssuedToken, IssueError> {
        let subject = self.subjects.encrypt(user_id)?;
        let claims = TokenClaims::new(subject, &self.issuer, lifespan)?;
        let token = codec.sign(&claims)?;
        Ok(IssuedToken {
            token,
            claims,
            lifespan,
        })
    }

    /// Mint a short-lived access token for a user.
    pub fn issue_access_token(&self, user_id: i64) -> Result<IssuedToken, IssueError> {
        self.issue(&self.access, user_id, self.access_lifespan)
    }

    /// Verify an access token and return the user ID it was issued to.
    pub fn verify_access_token(&self, token: &str) -> Option<i64> {
        let claims = self.access.verify(token, &self.issuer)?;
        match self.subjects.decrypt(&claims.sub) {
            Ok(user_id) => Some(user_id),
            Err(e) => {
                tracing::debug!(reason = %e, "Access token subject rejected");
                None
            }
        }
    }

    /// Mint a long-lived refresh token for a user.
    pub fn issue_refresh_token(&self, user_id: i64) -> Result<IssuedToken, IssueError> {
        self.issue(&self.refresh, user_id, self.refresh_lifespan)
    }

    /// Verify a refresh token's signature, issuer and expiry.
    /// The subject stays encrypted until the caller has checked revocation.
    pub fn verify_refresh_token(&self, token: &str) -> Option<TokenClaims> {
        self.refresh.verify(token, &self.issuer)
    }

    /// Decrypt the user ID from verified claims.
    pub fn decrypt_subject(&self, claims: &TokenClaims) -> Result<i64, SubjectError> {
        self.subjects.decrypt(&claims.sub)
    }
}

/// Errors while minting a token.
#[derive(Debug)]
pub enum IssueError {
    Subject(SubjectError),
    Jwt(JwtError),
}

impl From<SubjectError> for IssueError {
    fn from(e: SubjectError) -> Self {
        IssueError::Subject(e)
    }
}

impl From<JwtError> for IssueError {
    fn from(e: JwtError) -> Self {
        IssueError::Jwt(e)
    }
}

impl std::fmt::Display for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueError::Subject(e) => write!(f, "Failed to seal subject: {}", e),
            IssueError::Jwt(e) => write!(f, "Failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for IssueError {}
