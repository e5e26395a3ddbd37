//! Credential issuance and session renewal.
//!
//! - `sign_up`: create a user with a hashed password
//! - `sign_in`: check credentials, mint an access/refresh pair, store the refresh token
//! - `renew`: trade a stored, unexpired refresh token for a new access token
//! - `log_out`: optionally forget the stored refresh token
//! - `verify_access`: stateless bearer check used by protected routes

use tracing::{info, warn};

use super::errors::AuthError;
use super::types::IssuedSession;
use crate::db::Database;
use crate::jwt::{AccessClaims, AccessTokenResult, JwtConfig};
use crate::password::{hash_password, verify_password};

const MAX_EMAIL_LENGTH: usize = 254;
/// Bounds Argon2 work per request.
const MAX_PASSWORD_LENGTH: usize = 1024;

/// Validated sign-up / sign-in input.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Check that both fields are present and plausible.
    pub fn parse(email: Option<&str>, password: Option<&str>) -> Result<Self, AuthError> {
        let email = email.map(str::trim).unwrap_or_default();
        let password = password.unwrap_or_default();

        if email.is_empty() {
            return Err(AuthError::Validation("email is required".into()));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".into()));
        }
        if email.len() > MAX_EMAIL_LENGTH {
            return Err(AuthError::Validation("email is too long".into()));
        }
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AuthError::Validation("password is too long".into()));
        }
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => return Err(AuthError::Validation("email is not a valid address".into())),
        }

        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

/// Runs Argon2 off the async worker threads.
async fn hash_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .map_err(AuthError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .map_err(AuthError::from)
}

/// Create a new user. Returns the stored email.
pub async fn sign_up(db: &Database, credentials: Credentials) -> Result<String, AuthError> {
    if !db.users().is_email_available(&credentials.email).await? {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = hash_blocking(credentials.password).await?;
    let uuid = uuid::Uuid::new_v4().to_string();

    match db
        .users()
        .create(&uuid, &credentials.email, &password_hash)
        .await
    {
        Ok(_) => {}
        // Lost a race with a concurrent sign-up for the same address
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AuthError::EmailTaken);
        }
        Err(e) => return Err(e.into()),
    }

    info!(user = %uuid, "User signed up");
    Ok(credentials.email)
}

/// Authenticate and mint a token pair. The new refresh token replaces any
/// previously stored one, ending other sessions of the same user.
pub async fn sign_in(
    db: &Database,
    jwt: &JwtConfig,
    credentials: Credentials,
) -> Result<IssuedSession, AuthError> {
    let user = db
        .users()
        .get_by_email(&credentials.email)
        .await?
        .ok_or(AuthError::NotFound)?;

    if !verify_blocking(credentials.password, user.password_hash.clone()).await? {
        warn!(user = %user.uuid, "Sign-in with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let access = jwt.generate_access_token(&user.uuid, &user.email)?;
    let refresh = jwt.generate_refresh_token(&user.uuid)?;

    db.users()
        .set_refresh_token(user.id, &refresh.token, refresh.expires_at)
        .await?;

    info!(user = %user.uuid, "User signed in");
    Ok(IssuedSession {
        user,
        access,
        refresh,
    })
}

/// Mint a new access token from a refresh token. The refresh token itself
/// is not rotated, so repeated calls succeed until it expires or is replaced.
pub async fn renew(
    db: &Database,
    jwt: &JwtConfig,
    refresh_token: Option<&str>,
) -> Result<AccessTokenResult, AuthError> {
    let refresh_token = refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated("No refresh token"))?;

    let claims = jwt
        .validate_refresh_token(refresh_token)
        .map_err(|_| AuthError::InvalidToken)?;

    let user = db
        .users()
        .get_by_uuid(&claims.sub)
        .await?
        .ok_or(AuthError::Unauthenticated("User not found"))?;

    if user.refresh_token.as_deref() != Some(refresh_token) {
        warn!(user = %user.uuid, "Refresh token reused after supersession or revocation");
        return Err(AuthError::Unauthenticated("Refresh token has been revoked"));
    }

    Ok(jwt.generate_access_token(&user.uuid, &user.email)?)
}

/// End a session. Only touches the database when `revoke` is set, in which
/// case the stored token is cleared if it is still the presented one.
/// Returns whether a stored token was revoked.
pub async fn log_out(
    db: &Database,
    jwt: &JwtConfig,
    refresh_token: Option<&str>,
    revoke: bool,
) -> Result<bool, AuthError> {
    if !revoke {
        return Ok(false);
    }
    let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
        return Ok(false);
    };
    let Ok(claims) = jwt.validate_refresh_token(refresh_token) else {
        return Ok(false);
    };
    let Some(user) = db.users().get_by_uuid(&claims.sub).await? else {
        return Ok(false);
    };

    let revoked = db.users().clear_refresh_token(user.id, refresh_token).await?;
    if revoked {
        info!(user = %user.uuid, "Refresh token revoked on logout");
    }
    Ok(revoked)
}

/// Verify a bearer access token. Never touches the database.
pub fn verify_access(jwt: &JwtConfig, bearer: Option<&str>) -> Result<AccessClaims, AuthError> {
    let token = bearer
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated("Authentication required"))?;

    jwt.validate_access_token(token)
        .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig::new(b"access-secret-for-testing", b"refresh-secret-for-testing")
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials::parse(Some(email), Some(password)).unwrap()
    }

    #[test]
    fn test_credentials_validation() {
        assert!(matches!(
            Credentials::parse(None, Some("pw")),
            Err(AuthError::Validation(m)) if m == "email is required"
        ));
        assert!(matches!(
            Credentials::parse(Some("a@b.com"), Some("")),
            Err(AuthError::Validation(m)) if m == "password is required"
        ));
        assert!(matches!(
            Credentials::parse(Some("not-an-email"), Some("pw")),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            Credentials::parse(Some("a@b@c"), Some("pw")),
            Err(AuthError::Validation(_))
        ));

        let parsed = creds("  a@b.com ", "pw123456");
        assert_eq!(parsed.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = jwt();

        let email = sign_up(&db, creds("a@b.com", "pw123456")).await.unwrap();
        assert_eq!(email, "a@b.com");

        let session = sign_in(&db, &jwt, creds("a@b.com", "pw123456")).await.unwrap();
        let claims = verify_access(&jwt, Some(&session.access.token)).unwrap();
        assert_eq!(claims.sub, session.user.uuid);

        let stored = db.users().get_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(session.refresh.token.as_str()));
        assert_ne!(stored.password_hash, "pw123456");
    }

    #[tokio::test]
    async fn test_sign_up_duplicate() {
        let db = Database::open(":memory:").await.unwrap();

        sign_up(&db, creds("a@b.com", "pw")).await.unwrap();
        assert!(matches!(
            sign_up(&db, creds("A@B.com", "other")).await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_sign_in_failures() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = jwt();
        sign_up(&db, creds("a@b.com", "pw123456")).await.unwrap();

        assert!(matches!(
            sign_in(&db, &jwt, creds("x@y.com", "pw123456")).await,
            Err(AuthError::NotFound)
        ));
        assert!(matches!(
            sign_in(&db, &jwt, creds("a@b.com", "wrong")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_renew_is_repeatable() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = jwt();
        sign_up(&db, creds("a@b.com", "pw")).await.unwrap();
        let session = sign_in(&db, &jwt, creds("a@b.com", "pw")).await.unwrap();

        for _ in 0..3 {
            let access = renew(&db, &jwt, Some(&session.refresh.token)).await.unwrap();
            assert!(verify_access(&jwt, Some(&access.token)).is_ok());
        }
    }

    #[tokio::test]
    async fn test_second_sign_in_supersedes_first() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = jwt();
        sign_up(&db, creds("a@b.com", "pw")).await.unwrap();

        let first = sign_in(&db, &jwt, creds("a@b.com", "pw")).await.unwrap();
        let second = sign_in(&db, &jwt, creds("a@b.com", "pw")).await.unwrap();

        assert!(matches!(
            renew(&db, &jwt, Some(&first.refresh.token)).await,
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(renew(&db, &jwt, Some(&second.refresh.token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_renew_rejects_missing_and_tampered() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = jwt();
        sign_up(&db, creds("a@b.com", "pw")).await.unwrap();
        let session = sign_in(&db, &jwt, creds("a@b.com", "pw")).await.unwrap();

        assert!(matches!(
            renew(&db, &jwt, None).await,
            Err(AuthError::Unauthenticated(_))
        ));

        let mut bytes = session.refresh.token.clone().into_bytes();
        let idx = bytes.len() - 10;
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            renew(&db, &jwt, Some(&tampered)).await,
            Err(AuthError::InvalidToken)
        ));

        // An access token is not a refresh token
        assert!(matches!(
            renew(&db, &jwt, Some(&session.access.token)).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_log_out_revocation_is_opt_in() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = jwt();
        sign_up(&db, creds("a@b.com", "pw")).await.unwrap();
        let session = sign_in(&db, &jwt, creds("a@b.com", "pw")).await.unwrap();
        let token = session.refresh.token.as_str();

        assert!(!log_out(&db, &jwt, Some(token), false).await.unwrap());
        assert!(renew(&db, &jwt, Some(token)).await.is_ok());

        assert!(log_out(&db, &jwt, Some(token), true).await.unwrap());
        assert!(matches!(
            renew(&db, &jwt, Some(token)).await,
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_verify_access_errors() {
        let jwt = jwt();
        assert!(matches!(
            verify_access(&jwt, None),
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(matches!(
            verify_access(&jwt, Some("garbage")),
            Err(AuthError::InvalidToken)
        ));
    }
}
