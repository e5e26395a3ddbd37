//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use clap::Parser;
use std::num::NonZeroU32;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MIN_SECRET_LENGTH: usize = 32;

pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Ecometrix",
    about = "Yearly sustainability metrics with token-pair authentication"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "ecometrix.db")]
    pub database: String,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Set the Secure flag on the refresh cookie (enable when served over HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Also revoke the stored refresh token on logout, not just clear the cookie
    #[arg(long, env = "REVOKE_ON_LOGOUT")]
    pub revoke_on_logout: bool,

    /// Sign-in/sign-up requests allowed per client IP per minute (0 disables)
    #[arg(long, env = "AUTH_RATE_LIMIT", default_value = "10")]
    pub auth_rate_limit: u32,

    /// Key the rate limit on the first X-Forwarded-For hop. Only enable behind a
    /// reverse proxy that overwrites the header
    #[arg(long, env = "TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format. Filtering follows
/// `RUST_LOG`, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load a signing secret from an environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_name: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_name) {
        // Clear the environment variable to prevent leaking
        // SAFETY: secrets are loaded before the server and cleanup tasks are
        // spawned, so no other task reads or writes the environment meanwhile.
        unsafe { std::env::remove_var(env_name) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or pass a secret file",
            env_name
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_name, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        secure_cookies: args.secure_cookies,
        revoke_on_logout: args.revoke_on_logout,
        auth_rate_limit: NonZeroU32::new(args.auth_rate_limit),
        trust_forwarded_for: args.trust_forwarded_for,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
