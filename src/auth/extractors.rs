//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::AuthError;
use super::service::verify_access;
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for API endpoints that require authentication.
/// Validates the bearer access token statelessly; an expired token is
/// rejected and the client is expected to renew it via `/api/refresh`.
pub struct ApiAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = verify_access(state.jwt(), bearer_token(&parts.headers))?;
        Ok(ApiAuth(AuthenticatedUser { claims }))
    }
}
