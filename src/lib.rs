pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod issuer;
pub mod jwt;
pub mod rate_limit;
pub mod subject;

use api::create_api_router;
use auth::RefreshCookiePolicy;
use axum::Router;
use axum::http::HeaderName;
use db::Database;
use issuer::TokenIssuer;
use rate_limit::RateLimitConfig;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The four independent secrets. Each key protects a different thing, so none
/// may be reused for another purpose.
#[derive(Clone)]
pub struct AuthSecrets {
    /// Signs access tokens
    pub access: Vec<u8>,
    /// Signs refresh tokens
    pub refresh: Vec<u8>,
    /// Encrypts the subject claim
    pub subject: Vec<u8>,
    /// Signs the refresh cookie value
    pub cookie: Vec<u8>,
}

impl fmt::Debug for AuthSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSecrets").finish_non_exhaustive()
    }
}

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Value of the `iss` claim, checked on every verification
    pub issuer: String,
    pub secrets: AuthSecrets,
    /// Access token lifespan in seconds
    pub access_lifespan: u64,
    /// Refresh token lifespan in seconds
    pub refresh_lifespan: u64,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Header carrying the client IP (requires running behind a proxy)
    pub ip_header: Option<HeaderName>,
}

/// Create the application router with the given configuration.
/// Must be called from within a Tokio runtime: it spawns the rate limiter cleanup.
pub fn create_app(config: &ServerConfig) -> Router {
    let secrets = &config.secrets;

    let tokens = Arc::new(TokenIssuer::new(
        config.issuer.clone(),
        &secrets.subject,
        &secrets.access,
        config.access_lifespan,
        &secrets.refresh,
        config.refresh_lifespan,
    ));
    let cookies = Arc::new(RefreshCookiePolicy::new(
        &secrets.cookie,
        config.secure_cookies,
    ));
    let rate_limit = Arc::new(RateLimitConfig::new(config.ip_header.clone()));
    cleanup::spawn_limiter_cleanup(&rate_limit);

    create_api_router(config.db.clone(), tokens, cookies, rate_limit)
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task.
/// Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
