mod error;
mod metrics;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ApiJson, ResultExt};
pub use metrics::MetricsState;
pub use session::SessionState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    secure_cookies: bool,
    revoke_on_logout: bool,
    rate_limit: Option<Arc<RateLimitConfig>>,
) -> Router {
    let session_state = session::SessionState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
        revoke_on_logout,
    };

    let metrics_state = metrics::MetricsState { db, jwt };

    Router::new()
        .merge(session::router(session_state, rate_limit))
        .merge(metrics::router(metrics_state))
}
