//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for sign-in and sign-up.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub credentials: Arc<IpLimiter>,
    /// Key on the first `X-Forwarded-For` hop instead of the socket address
    pub trust_forwarded_for: bool,
}

impl RateLimitConfig {
    /// Allow `per_minute` credential requests per client IP, with the same burst.
    pub fn new(per_minute: NonZeroU32, trust_forwarded_for: bool) -> Self {
        Self {
            credentials: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            trust_forwarded_for,
        }
    }
}

/// Middleware for rate limiting sign-in and sign-up.
pub async fn rate_limit_credentials(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request, config.trust_forwarded_for);

    match config.credentials.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Credential rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "Too many attempts. Please wait before trying again."
                })),
            )
                .into_response()
        }
    }
}
