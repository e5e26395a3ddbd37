//! Authentication user types.

use crate::db::User;
use crate::jwt::{AccessTokenResult, AccessClaims, RefreshTokenResult};

/// Caller identity extracted from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// JWT claims from the access token
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    /// UUID of the user the token was issued to.
    pub fn user_uuid(&self) -> &str {
        &self.claims.sub
    }
}

/// Tokens minted by a successful sign-in.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub access: AccessTokenResult,
    /// Already stored against the user; handed to the client as a cookie
    pub refresh: RefreshTokenResult,
}
