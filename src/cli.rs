//! CLI argument parsing, validation, and startup helpers.

use crate::db::{Database, hash_password};
use crate::issuer::{DEFAULT_ACCESS_LIFESPAN_SECS, DEFAULT_REFRESH_LIFESPAN_SECS, MAX_LIFESPAN_SECS};
use crate::{AuthSecrets, ServerConfig};
use axum::http::HeaderName;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::Parser;
use rand::RngCore;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

/// Random bytes in a generated password (before base64).
const GENERATED_PASSWORD_BYTES: usize = 18;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Quillgate",
    about = "Token issuance, verification and revocation service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "QUILLGATE_PORT", default_value = "7292")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "QUILLGATE_DATABASE", default_value = "quillgate.db")]
    pub database: String,

    /// Value of the `iss` claim placed in and required of every token
    #[arg(long, env = "QUILLGATE_ISSUER", default_value = "quillgate")]
    pub issuer: String,

    /// Access token lifespan in seconds (at most 10 years)
    #[arg(
        long,
        default_value_t = DEFAULT_ACCESS_LIFESPAN_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_LIFESPAN_SECS)
    )]
    pub access_token_lifespan: u64,

    /// Refresh token lifespan in seconds (at most 10 years)
    #[arg(
        long,
        default_value_t = DEFAULT_REFRESH_LIFESPAN_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_LIFESPAN_SECS)
    )]
    pub refresh_token_lifespan: u64,

    /// Deployment environment. Production marks the refresh cookie Secure
    #[arg(long, env = "QUILLGATE_ENVIRONMENT", default_value = "development")]
    pub environment: Environment,

    /// Read the client IP from this header (e.g. X-Forwarded-For) when behind a proxy
    #[arg(long, value_parser = parse_header_name)]
    pub ip_header: Option<HeaderName>,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Path to file containing the subject encryption secret. Prefer SUBJECT_SECRET
    #[arg(long)]
    pub subject_secret_file: Option<String>,

    /// Path to file containing the cookie signing secret. Prefer COOKIE_SECRET
    #[arg(long)]
    pub cookie_secret_file: Option<String>,

    /// Create a user with a generated password, print it, and exit
    #[arg(long, value_name = "USERNAME")]
    pub create_user: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_header_name(s: &str) -> Result<HeaderName, String> {
    HeaderName::try_from(s).map_err(|e| format!("Invalid header name '{}': {}", s, e))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load one secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read {} file", env_var);
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use the matching --*-secret-file flag",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Load all four secrets and check that no two are the same.
pub fn load_secrets(args: &Args) -> Option<AuthSecrets> {
    let secrets = AuthSecrets {
        access: load_secret("ACCESS_TOKEN_SECRET", args.access_secret_file.as_deref())?,
        refresh: load_secret("REFRESH_TOKEN_SECRET", args.refresh_secret_file.as_deref())?,
        subject: load_secret("SUBJECT_SECRET", args.subject_secret_file.as_deref())?,
        cookie: load_secret("COOKIE_SECRET", args.cookie_secret_file.as_deref())?,
    };

    if !secrets_are_distinct(&secrets) {
        error!("Each secret must be different. Do not reuse a secret for two purposes");
        return None;
    }

    Some(secrets)
}

fn secrets_are_distinct(secrets: &AuthSecrets) -> bool {
    let all = [
        &secrets.access,
        &secrets.refresh,
        &secrets.subject,
        &secrets.cookie,
    ];
    all.iter()
        .enumerate()
        .all(|(i, a)| all[i + 1..].iter().all(|b| a != b))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, secrets: AuthSecrets) -> ServerConfig {
    ServerConfig {
        db,
        issuer: args.issuer.clone(),
        secrets,
        access_lifespan: args.access_token_lifespan,
        refresh_lifespan: args.refresh_token_lifespan,
        secure_cookies: args.environment == Environment::Production,
        ip_header: args.ip_header.clone(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

fn generate_password() -> String {
    let mut bytes = [0u8; GENERATED_PASSWORD_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Handle the --create-user flag: create the user and print its password once.
/// Returns false if the user could not be created.
pub async fn handle_create_user(db: &Database, username: &str) -> bool {
    if username.trim().is_empty() {
        error!("Username must not be empty");
        return false;
    }

    match db.users().get_by_username(username).await {
        Ok(Some(_)) => {
            error!(username = %username, "User already exists");
            return false;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            return false;
        }
    }

    let password = generate_password();
    let hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return false;
        }
    };

    match db.users().create(username, &hash).await {
        Ok(id) => {
            info!(user_id = id, "User created");
            println!();
            println!("User created: {}", username);
            println!("Password: {}", password);
            println!();
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(access: &str, refresh: &str, subject: &str, cookie: &str) -> AuthSecrets {
        AuthSecrets {
            access: access.into(),
            refresh: refresh.into(),
            subject: subject.into(),
            cookie: cookie.into(),
        }
    }

    #[test]
    fn test_distinct_secrets_accepted() {
        assert!(secrets_are_distinct(&secrets("a", "b", "c", "d")));
    }

    #[test]
    fn test_reused_secret_rejected() {
        assert!(!secrets_are_distinct(&secrets("a", "b", "c", "a")));
        assert!(!secrets_are_distinct(&secrets("a", "b", "b", "d")));
    }

    #[test]
    fn test_load_secret_from_file_trims_whitespace() {
        let path = std::env::temp_dir().join(format!("quillgate-secret-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, format!("{}\n", "s".repeat(40))).unwrap();

        let secret = load_secret(
            "QUILLGATE_TEST_UNSET_SECRET",
            Some(path.to_str().unwrap()),
        );
        std::fs::remove_file(&path).ok();

        assert_eq!(secret.unwrap(), "s".repeat(40).into_bytes());
    }

    #[test]
    fn test_short_secret_rejected() {
        let path = std::env::temp_dir().join(format!("quillgate-secret-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, "too-short").unwrap();

        let secret = load_secret(
            "QUILLGATE_TEST_UNSET_SECRET",
            Some(path.to_str().unwrap()),
        );
        std::fs::remove_file(&path).ok();

        assert!(secret.is_none());
    }

    #[test]
    fn test_generated_passwords_differ() {
        let a = generate_password();
        let b = generate_password();
        assert_ne!(a, b);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["quillgate"]).unwrap();
        assert_eq!(args.access_token_lifespan, 900);
        assert_eq!(args.refresh_token_lifespan, 14 * 24 * 60 * 60);
        assert_eq!(args.environment, Environment::Development);
        assert!(args.ip_header.is_none());
    }

    #[test]
    fn test_zero_lifespan_rejected() {
        assert!(Args::try_parse_from(["quillgate", "--access-token-lifespan", "0"]).is_err());
    }

    #[test]
    fn test_oversized_lifespan_rejected() {
        let too_long = (MAX_LIFESPAN_SECS + 1).to_string();
        assert!(
            Args::try_parse_from(["quillgate", "--refresh-token-lifespan", too_long.as_str()])
                .is_err()
        );
        assert!(
            Args::try_parse_from(["quillgate", "--access-token-lifespan", "18446744073709551615"])
                .is_err()
        );

        let max = MAX_LIFESPAN_SECS.to_string();
        let args =
            Args::try_parse_from(["quillgate", "--refresh-token-lifespan", max.as_str()]).unwrap();
        assert_eq!(args.refresh_token_lifespan, MAX_LIFESPAN_SECS);
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate() {
        let db = Database::open(":memory:").await.unwrap();
        db.users().create("alice", "hash").await.unwrap();
        assert!(!handle_create_user(&db, "alice").await);
    }
}
