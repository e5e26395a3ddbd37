use sqlx::sqlite::SqlitePool;

use super::timestamp_to_datetime;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub password_hash: String,
    /// The single refresh token currently honored for this user
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<String>,
}

const USER_COLUMNS: &str =
    "id, uuid, email, password_hash, refresh_token, refresh_token_expires_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(
        &self,
        uuid: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (uuid, email, password_hash) VALUES (?, ?, ?)")
            .bind(uuid)
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE uuid = ?"))
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn is_email_available(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 == 0)
    }

    /// Replace the stored refresh token. Any previously issued refresh token
    /// for this user stops being honored.
    pub async fn set_refresh_token(
        &self,
        id: i64,
        token: &str,
        expires_at: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = ?, refresh_token_expires_at = ? WHERE id = ?",
        )
        .bind(token)
        .bind(timestamp_to_datetime(expires_at))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop the stored refresh token, but only if it is still `token`.
    /// A newer sign-in elsewhere is left untouched.
    pub async fn clear_refresh_token(&self, id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = NULL, refresh_token_expires_at = NULL
             WHERE id = ? AND refresh_token = ?",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear stored refresh tokens whose expiry has passed.
    pub async fn clear_expired_refresh_tokens(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = NULL, refresh_token_expires_at = NULL
             WHERE refresh_token_expires_at < datetime('now')",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
