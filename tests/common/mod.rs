#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use quillgate::{AuthSecrets, ServerConfig, create_app, db::Database};
use serde_json::Value;
use tower::ServiceExt;

pub const ISSUER: &str = "quillgate-test";
pub const ACCESS_LIFESPAN: u64 = 900;
pub const REFRESH_LIFESPAN: u64 = 14 * 24 * 60 * 60;

/// Cheap bcrypt cost so tests don't spend seconds hashing.
const TEST_BCRYPT_COST: u32 = 4;

pub fn test_secrets() -> AuthSecrets {
    AuthSecrets {
        access: b"test-access-secret-0123456789abcdef".to_vec(),
        refresh: b"test-refresh-secret-0123456789abcdef".to_vec(),
        subject: b"test-subject-secret-0123456789abcdef".to_vec(),
        cookie: b"test-cookie-secret-0123456789abcdef".to_vec(),
    }
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        issuer: ISSUER.to_string(),
        secrets: test_secrets(),
        access_lifespan: ACCESS_LIFESPAN,
        refresh_lifespan: REFRESH_LIFESPAN,
        secure_cookies: false,
        ip_header: None,
    }
}

/// Create a test app and return (app, db).
pub async fn create_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    (create_app(&test_config(db.clone())), db)
}

/// Create a user with the given password. Returns the user ID.
pub async fn create_user(db: &Database, username: &str, password: &str) -> i64 {
    let hash = bcrypt::hash(password, TEST_BCRYPT_COST).unwrap();
    db.users().create(username, &hash).await.unwrap()
}

pub fn login_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tokens")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn login(app: &Router, username: &str, password: &str) -> Response<Body> {
    app.clone()
        .oneshot(login_request(serde_json::json!({
            "username": username,
            "password": password,
        })))
        .await
        .unwrap()
}

/// Log in and return the `name=value` pair of the refresh cookie.
pub async fn login_cookie(app: &Router, username: &str, password: &str) -> String {
    let response = login(app, username, password).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    cookie_pair(&response).expect("login should set the refresh cookie")
}

/// The `Set-Cookie` header of a response.
pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// The `name=value` part of the `Set-Cookie` header.
pub fn cookie_pair(response: &Response<Body>) -> Option<String> {
    set_cookie(response).and_then(|c| c.split(';').next().map(str::to_string))
}

pub fn access_token_request(cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tokens/access_token")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn logout_request(cookie: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri("/tokens")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn verify_request(authorization: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/tokens/verify")
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
