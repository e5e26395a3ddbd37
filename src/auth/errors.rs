//! Authentication error types.

use crate::jwt::JwtError;

/// Failures of the sign-up, sign-in, renewal and verification flows.
///
/// Converted to an HTTP response at the API boundary; see `api::error`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed input field
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    EmailTaken,

    /// Unknown email on sign-in
    #[error("User does not exist")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No credential presented, or a refresh token that is no longer the
    /// stored one for its user
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Malformed, expired, or badly signed token
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
