mod error;
mod tokens;

use axum::Router;
use std::sync::Arc;

use crate::auth::RefreshCookiePolicy;
use crate::db::Database;
use crate::issuer::TokenIssuer;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;
pub use tokens::TokensState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    tokens: Arc<TokenIssuer>,
    cookies: Arc<RefreshCookiePolicy>,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let tokens_state = TokensState {
        db,
        tokens,
        cookies,
        rate_limit,
    };

    Router::new().nest("/tokens", tokens::router(tokens_state))
}
