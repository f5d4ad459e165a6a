//! Token API endpoints.
//!
//! - POST `/` - Log in with username/password, set the refresh cookie
//! - POST `/access_token` - Exchange the refresh cookie for an access token
//! - DELETE `/` - Revoke the refresh token and clear the cookie
//! - GET `/verify` - Check a bearer access token

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ApiError;
use crate::auth::{
    BearerAuth, RefreshAuth, RefreshCookie, RefreshCookiePolicy, authenticate_password,
};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::issuer::TokenIssuer;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub cookies: Arc<RefreshCookiePolicy>,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(TokensState);

pub fn router(state: TokensState) -> Router {
    let throttle = middleware::from_fn_with_state(state.rate_limit.clone(), rate_limit_login);

    Router::new()
        // Layer before adding DELETE so only login is throttled.
        .route("/", post(login).layer(throttle).delete(logout))
        .route("/access_token", post(access_token))
        .route("/verify", get(verify_token))
        .with_state(state)
}

struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

impl LoginRequest {
    /// Read the credentials from a JSON object. Anything else, including a
    /// field of the wrong type, reads as missing fields.
    fn from_body(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or_default();
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(String::from);
        Self {
            username: field("username"),
            password: field("password"),
        }
    }
}

/// Treat absent and empty fields alike.
fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{} required", field)))
}

/// Log in and receive a refresh token cookie.
async fn login(
    State(state): State<TokensState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map_err(|_| ApiError::bad_request("username required"))?;
    let payload = LoginRequest::from_body(&body);
    let username = required(payload.username, "username")?;
    let password = required(payload.password, "password")?;

    let user = authenticate_password(&state.db, &username, password).await?;

    let refresh = state.tokens.issue_refresh_token(user.id).map_err(|e| {
        ApiError::internal_logged("Failed to issue refresh token", e, "failed to issue token")
    })?;

    info!(user_id = user.id, "User logged in");

    let cookie = state.cookies.set_cookie(&refresh.token, refresh.lifespan);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]))
}

#[derive(Serialize)]
struct AccessTokenResponse {
    #[serde(rename = "type")]
    token_type: &'static str,
    access_token: String,
    expiration: u64,
}

/// Mint an access token from a valid, unrevoked refresh token.
async fn access_token(
    State(state): State<TokensState>,
    RefreshAuth(session): RefreshAuth,
) -> Result<impl IntoResponse, ApiError> {
    let access = state.tokens.issue_access_token(session.user_id).map_err(|e| {
        ApiError::internal_logged("Failed to issue access token", e, "failed to issue token")
    })?;

    debug!(
        user_id = session.user_id,
        refresh_jti = %session.claims.jti,
        "Access token issued"
    );

    Ok(Json(AccessTokenResponse {
        token_type: "Bearer",
        access_token: access.token,
        expiration: access.lifespan,
    }))
}

/// Log out: revoke the refresh token and clear its cookie.
async fn logout(
    State(state): State<TokensState>,
    RefreshCookie(claims): RefreshCookie,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .db
        .revocations()
        .revoke(&claims)
        .await
        .map_err(|e| ApiError::internal_logged("Failed to revoke token", e, "failed to revoke"))?;

    if !revoked {
        return Err(ApiError::conflict("already revoked"));
    }

    info!(jti = %claims.jti, "Refresh token revoked");

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, state.cookies.clear_cookie())],
    ))
}

#[derive(Serialize)]
struct VerifyResponse {
    user_id: i64,
}

/// Verify that the bearer access token is valid.
/// Returns 200 if valid, 401 if not.
async fn verify_token(BearerAuth(user): BearerAuth) -> impl IntoResponse {
    Json(VerifyResponse {
        user_id: user.user_id,
    })
}
