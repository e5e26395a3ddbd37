//! Scheduled cleanup of expired refresh tokens.

use crate::db::Database;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database) {
    match db.users().clear_expired_refresh_tokens().await {
        Ok(count) if count > 0 => info!("Cleared {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clear expired refresh tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; startup already ran a pass
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_cleanup_clears_only_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let expired = db.users().create("u-1", "a@b.com", "hash").await.unwrap();
        let live = db.users().create("u-2", "c@d.com", "hash").await.unwrap();

        let now = chrono::Utc::now().timestamp() as u64;
        db.users().set_refresh_token(expired, "old", now - 10).await.unwrap();
        db.users().set_refresh_token(live, "new", now + 3600).await.unwrap();

        run_cleanup(&db).await;

        let expired = db.users().get_by_uuid("u-1").await.unwrap().unwrap();
        let live = db.users().get_by_uuid("u-2").await.unwrap().unwrap();
        assert_eq!(expired.refresh_token, None);
        assert_eq!(live.refresh_token.as_deref(), Some("new"));
    }
}
