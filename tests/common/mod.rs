#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use ecometrix::{ServerConfig, create_app, db::Database, jwt::JwtConfig};
use serde_json::Value;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-at-least-32-characters";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-at-least-32-characters";

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "pw123456";

/// Server configuration over a fresh in-memory database, rate limiting off.
pub async fn test_config() -> ServerConfig {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    ServerConfig {
        db,
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        secure_cookies: false,
        revoke_on_logout: false,
        auth_rate_limit: None,
        trust_forwarded_for: false,
    }
}

pub fn jwt() -> JwtConfig {
    JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET)
}

/// Create a test app and return (app, db).
pub async fn create_test_app() -> (Router, Database) {
    create_test_app_with(|_| {}).await
}

/// Create a test app after adjusting the default configuration.
pub async fn create_test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> (Router, Database) {
    let mut config = test_config().await;
    configure(&mut config);
    (create_app(&config), config.db.clone())
}

pub fn rate_limited(per_minute: u32) -> impl FnOnce(&mut ServerConfig) {
    move |config| config.auth_rate_limit = NonZeroU32::new(per_minute)
}

/// Rate limiting keyed on `X-Forwarded-For`, as behind a trusted proxy.
pub fn rate_limited_behind_proxy(per_minute: u32) -> impl FnOnce(&mut ServerConfig) {
    move |config| {
        config.auth_rate_limit = NonZeroU32::new(per_minute);
        config.trust_forwarded_for = true;
    }
}

/// Build a JSON POST request.
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a JSON POST request with a bearer token.
pub fn post_json_auth(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a GET request with a bearer token.
pub fn get_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Build a body-less POST request carrying the refresh cookie.
pub fn post_with_refresh_cookie(uri: &str, refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, format!("refreshToken={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
pub async fn response_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of the `refreshToken` cookie set by the response, if any.
pub fn refresh_token_from(response: &Response<Body>) -> Option<String> {
    extract_set_cookies(response).iter().find_map(|cookie| {
        let first = cookie.split(';').next()?;
        let value = first.strip_prefix("refreshToken=")?;
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Check if cookies contain the refresh cookie being cleared (Max-Age=0)
pub fn has_cleared_refresh_cookie(response: &Response<Body>) -> bool {
    extract_set_cookies(response)
        .iter()
        .any(|c| c.starts_with("refreshToken=;") && c.contains("Max-Age=0"))
}

pub async fn sign_up(app: &Router, email: &str, password: &str) -> Response<Body> {
    app.clone()
        .oneshot(post_json(
            "/api/signup",
            serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap()
}

pub async fn sign_in(app: &Router, email: &str, password: &str) -> Response<Body> {
    app.clone()
        .oneshot(post_json(
            "/api/signin",
            serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap()
}

/// Sign up and sign in, returning (access_token, refresh_token).
pub async fn signed_in_user(app: &Router, email: &str, password: &str) -> (String, String) {
    assert_eq!(sign_up(app, email, password).await.status(), StatusCode::CREATED);

    let response = sign_in(app, email, password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let refresh = refresh_token_from(&response).expect("sign-in sets the refresh cookie");
    let body = response_json(response).await;
    let access = body["accessToken"].as_str().unwrap().to_string();
    (access, refresh)
}

/// Serve `app` on a random local port in a background task.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .ok();
    });
    addr
}
