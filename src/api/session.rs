//! Account and session endpoints.
//!
//! - POST `/signup` - Create an account
//! - POST `/signin` - Exchange credentials for an access token and a refresh cookie
//! - POST `/refresh` - Exchange the refresh cookie for a new access token
//! - POST `/logout` - Clear the refresh cookie

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::error::{ApiError, ApiJson};
use crate::auth::{
    AuthError, Credentials, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie,
    refresh_cookie, service,
};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_credentials};

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub revoke_on_logout: bool,
}

pub fn router(state: SessionState, rate_limit: Option<Arc<RateLimitConfig>>) -> Router {
    let credentials_router = Router::new()
        .route("/signup", post(sign_up))
        .route("/signin", post(sign_in))
        .with_state(state.clone());

    let credentials_router = match rate_limit {
        Some(config) => credentials_router
            .layer(middleware::from_fn_with_state(config, rate_limit_credentials)),
        None => credentials_router,
    };

    let session_router = Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state);

    Router::new().merge(credentials_router).merge(session_router)
}

/// Fields are optional so a missing one yields a field-level message
/// instead of a generic deserialization error.
#[derive(Deserialize)]
struct CredentialsRequest {
    email: Option<String>,
    password: Option<String>,
}

impl CredentialsRequest {
    fn parse(&self) -> Result<Credentials, AuthError> {
        Credentials::parse(self.email.as_deref(), self.password.as_deref())
    }
}

#[derive(Serialize)]
struct SignUpResponse {
    email: String,
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    access_token: String,
    email: String,
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    success: bool,
}

async fn sign_up(
    State(state): State<SessionState>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = payload.parse()?;
    let email = service::sign_up(&state.db, credentials).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            email,
            success: true,
        }),
    ))
}

async fn sign_in(
    State(state): State<SessionState>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = payload.parse()?;
    let session = service::sign_in(&state.db, &state.jwt, credentials).await?;

    Ok((
        StatusCode::OK,
        [(
            SET_COOKIE,
            refresh_cookie(&session.refresh.token, state.secure_cookies),
        )],
        Json(SignInResponse {
            access_token: session.access.token,
            email: session.user.email,
            success: true,
        }),
    ))
}

/// Mint a new access token. A rejected cookie is cleared so the browser
/// stops sending it.
async fn refresh(State(state): State<SessionState>, headers: HeaderMap) -> Response {
    let token = get_cookie(&headers, REFRESH_COOKIE_NAME);

    match service::renew(&state.db, &state.jwt, token).await {
        Ok(access) => (
            StatusCode::OK,
            Json(RefreshResponse {
                access_token: access.token,
                success: true,
            }),
        )
            .into_response(),
        Err(e @ (AuthError::InvalidToken | AuthError::Unauthenticated(_))) if token.is_some() => (
            [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
            ApiError::from(e),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Always succeeds. The stored refresh token is only revoked when the
/// server runs with revoke-on-logout.
async fn logout(State(state): State<SessionState>, headers: HeaderMap) -> impl IntoResponse {
    let token = get_cookie(&headers, REFRESH_COOKIE_NAME);

    if let Err(e) = service::log_out(&state.db, &state.jwt, token, state.revoke_on_logout).await {
        warn!("Failed to revoke refresh token on logout: {}", e);
    }

    (
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true })),
    )
}
