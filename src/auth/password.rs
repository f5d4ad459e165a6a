//! Username/password check for login.

use tracing::debug;

use crate::db::{Database, User, verify_dummy_password};

/// Why a login attempt did not produce a user.
#[derive(Debug)]
pub enum LoginError {
    /// Unknown username or wrong password; callers must not tell these apart
    InvalidCredentials,
    /// The user could not be looked up
    Lookup(sqlx::Error),
    /// The password check task died
    Task(tokio::task::JoinError),
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginError::InvalidCredentials => write!(f, "Invalid credentials"),
            LoginError::Lookup(e) => write!(f, "Failed to get user: {}", e),
            LoginError::Task(e) => write!(f, "Password verification task failed: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

/// Look up `username` and check `password` against its stored hash.
///
/// An unknown username and a wrong password are indistinguishable to the
/// caller, and both cost one bcrypt verification.
pub async fn authenticate_password(
    db: &Database,
    username: &str,
    password: String,
) -> Result<User, LoginError> {
    let user = db
        .users()
        .get_by_username(username)
        .await
        .map_err(LoginError::Lookup)?;

    let verified = tokio::task::spawn_blocking(move || match user {
        Some(user) => user.verify_password(&password).then_some(user),
        None => {
            verify_dummy_password(&password);
            None
        }
    })
    .await
    .map_err(LoginError::Task)?;

    verified.ok_or_else(|| {
        debug!(username = %username, "Login rejected");
        LoginError::InvalidCredentials
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db_with_user(username: &str, password: &str) -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let hash = bcrypt::hash(password, 4).unwrap();
        let id = db.users().create(username, &hash).await.unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_correct_password() {
        let (db, id) = db_with_user("vamp", "testing").await;

        let user = authenticate_password(&db, "vamp", "testing".to_string())
            .await
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_alike() {
        let (db, _) = db_with_user("vamp", "testing").await;

        let wrong_password = authenticate_password(&db, "vamp", "nope".to_string()).await;
        let unknown_user = authenticate_password(&db, "nobody", "testing".to_string()).await;

        assert!(matches!(wrong_password, Err(LoginError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let (db, _) = db_with_user("vamp", "testing").await;
        db.pool().close().await;

        let result = authenticate_password(&db, "vamp", "testing".to_string()).await;
        assert!(matches!(result, Err(LoginError::Lookup(_))));
    }
}
