//! JWT signing and verification.
//!
//! The codec knows nothing about what a subject means. It signs claims with
//! HS256, always setting the algorithm itself, and verifies signature, issuer
//! and expiry in that order.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// The only algorithm this codec signs with or accepts.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (encrypted user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// JWT ID, unique per issuance (revocation key)
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl TokenClaims {
    /// Build claims expiring `lifespan_secs` from now, with a fresh JTI.
    pub fn new(subject: String, issuer: &str, lifespan_secs: u64) -> Result<Self, JwtError> {
        let now = now_secs()?;
        Ok(Self {
            sub: subject,
            iss: issuer.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now
                .checked_add(lifespan_secs)
                .ok_or(JwtError::ExpiryOverflow)?,
        })
    }
}

/// HS256 codec bound to a single signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Serialize and sign claims.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Check signature, issuer and expiry, in that order.
    pub fn validate(&self, token: &str, expected_issuer: &str) -> Result<TokenClaims, JwtError> {
        // Issuer and expiry are checked by hand below so the order is fixed
        // and each failure can be told apart in logs.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp", "iss", "sub"].map(String::from));

        let claims = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => JwtError::BadSignature,
                _ => JwtError::Malformed(e),
            })?
            .claims;

        if claims.iss != expected_issuer {
            return Err(JwtError::WrongIssuer);
        }

        if claims.exp <= now_secs()? {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    /// Like [`validate`](Self::validate), but collapses every failure to `None`.
    /// The reason is only logged.
    pub fn verify(&self, token: &str, expected_issuer: &str) -> Option<TokenClaims> {
        match self.validate(token, expected_issuer) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(reason = %e, "Token rejected");
                None
            }
        }
    }
}

/// Current Unix time in seconds.
pub fn now_secs() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Not a well-formed HS256 token
    Malformed(jsonwebtoken::errors::Error),
    /// Signature does not match
    BadSignature,
    /// Signed by us but for another issuer
    WrongIssuer,
    /// Past its expiry
    Expired,
    /// System time error
    TimeError,
    /// Lifespan too large to express an expiry
    ExpiryOverflow,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Malformed(e) => write!(f, "Malformed token: {}", e),
            JwtError::BadSignature => write!(f, "Bad signature"),
            JwtError::WrongIssuer => write!(f, "Wrong issuer"),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::ExpiryOverflow => write!(f, "Token lifespan overflows its expiry"),
        }
    }
}

impl std::error::Error for JwtError {}
