//! Revoked refresh token ledger.
//!
//! Only refresh tokens are ever recorded here. Access tokens are stateless
//! and short-lived, and are never looked up. Each record outlives the token
//! it revokes by [`REVOCATION_BUFFER_SECS`], after which the cleanup sweep
//! deletes it.

use sqlx::sqlite::SqlitePool;

use crate::jwt::TokenClaims;

/// How long a revocation record is kept past its token's own expiry.
pub const REVOCATION_BUFFER_SECS: u64 = 60 * 60;

/// A revoked refresh token record.
#[cfg(test)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevokedToken {
    pub jti: String,
    pub expires_at: i64,
    pub revoked_at: String,
}

/// Store for revoked refresh tokens.
pub struct RevocationStore {
    pool: SqlitePool,
}

impl RevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Revoke the token described by `claims`.
    ///
    /// Returns `true` if this call revoked it and `false` if it was already
    /// revoked. Any other failure is returned as an error.
    pub async fn revoke(&self, claims: &TokenClaims) -> Result<bool, sqlx::Error> {
        let expires_at = claims.exp.saturating_add(REVOCATION_BUFFER_SECS);

        let result = sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES (?, ?) ON CONFLICT(jti) DO NOTHING",
        )
        .bind(&claims.jti)
        .bind(to_db_timestamp(expires_at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Check whether the token described by `claims` has been revoked.
    pub async fn is_revoked(&self, claims: &TokenClaims) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE jti = ?")
            .bind(&claims.jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Get a revocation record by its JWT ID.
    #[cfg(test)]
    pub(crate) async fn get_by_jti(&self, jti: &str) -> Result<Option<RevokedToken>, sqlx::Error> {
        sqlx::query_as("SELECT jti, expires_at, revoked_at FROM revoked_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete records whose retention ended before `now` (Unix seconds).
    pub async fn delete_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(to_db_timestamp(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// SQLite integers are signed; clamp instead of wrapping.
fn to_db_timestamp(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::jwt::TokenClaims;

    use super::REVOCATION_BUFFER_SECS;

    fn claims(jti: &str, exp: u64) -> TokenClaims {
        TokenClaims {
            sub: "subject".to_string(),
            iss: "quillgate-test".to_string(),
            jti: jti.to_string(),
            iat: exp - 60,
            exp,
        }
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        let claims = claims("jti-1", 1_000_000);

        assert!(!db.revocations().is_revoked(&claims).await.unwrap());

        assert!(db.revocations().revoke(&claims).await.unwrap());
        assert!(db.revocations().is_revoked(&claims).await.unwrap());

        assert!(!db.revocations().revoke(&claims).await.unwrap());
        assert!(db.revocations().is_revoked(&claims).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_outlives_token_by_buffer() {
        let db = Database::open(":memory:").await.unwrap();
        let claims = claims("jti-1", 1_000_000);

        db.revocations().revoke(&claims).await.unwrap();

        let record = db.revocations().get_by_jti("jti-1").await.unwrap().unwrap();
        assert_eq!(
            record.expires_at,
            (1_000_000 + REVOCATION_BUFFER_SECS) as i64
        );
    }

    #[tokio::test]
    async fn test_revocations_are_per_token() {
        let db = Database::open(":memory:").await.unwrap();
        let a = claims("jti-a", 1_000_000);
        let b = claims("jti-b", 1_000_000);

        db.revocations().revoke(&a).await.unwrap();

        assert!(db.revocations().is_revoked(&a).await.unwrap());
        assert!(!db.revocations().is_revoked(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_revoke_has_one_winner() {
        let db = Database::open(":memory:").await.unwrap();
        let claims = claims("jti-race", 1_000_000);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = db.clone();
            let claims = claims.clone();
            handles.push(tokio::spawn(async move {
                db.revocations().revoke(&claims).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let old = claims("jti-old", 1_000);
        let live = claims("jti-live", 1_000_000);

        db.revocations().revoke(&old).await.unwrap();
        db.revocations().revoke(&live).await.unwrap();

        // Old record retained until 1_000 + buffer.
        let deleted = db.revocations().delete_expired(1_000).await.unwrap();
        assert_eq!(deleted, 0);

        let deleted = db
            .revocations()
            .delete_expired(1_001 + REVOCATION_BUFFER_SECS)
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        assert!(!db.revocations().is_revoked(&old).await.unwrap());
        assert!(db.revocations().is_revoked(&live).await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_error() {
        let db = Database::open(":memory:").await.unwrap();
        let claims = claims("jti-1", 1_000_000);

        db.pool().close().await;

        assert!(db.revocations().revoke(&claims).await.is_err());
        assert!(db.revocations().is_revoked(&claims).await.is_err());
    }
}
