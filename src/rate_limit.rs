//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password guessing.

use axum::{
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::api::ApiError;
use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Bucket shared by requests whose address cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting configuration for the login endpoint.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login (1 request per second, burst of 5)
    pub login: Arc<IpLimiter>,
    /// Header carrying the client IP when running behind a proxy
    pub ip_header: Option<HeaderName>,
}

impl RateLimitConfig {
    const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
    const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();

    /// Create rate limiters with default configuration.
    pub fn new(ip_header: Option<HeaderName>) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(Self::LOGIN_PER_SEC).allow_burst(Self::LOGIN_BURST),
            )),
            ip_header,
        }
    }

    /// Forget clients whose budget has fully refilled.
    /// Returns how many clients are still tracked.
    pub fn prune(&self) -> usize {
        self.login.retain_recent();
        self.login.shrink_to_fit();
        self.login.len()
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.ip_header.as_ref()) {
        Ok(ip) => ip,
        Err(reason) if config.ip_header.is_some() => {
            warn!(reason, "Rejecting login without a client IP");
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
        Err(_) => UNKNOWN_CLIENT.to_string(),
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => ApiError::TooManyRequests("too many login attempts".into()).into_response(),
    }
}
