//! Storage for yearly sustainability metric records.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct MetricStore {
    pool: SqlitePool,
}

/// A validated metric ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMetric {
    pub year: String,
    pub carbon: f64,
    pub water: f64,
    pub waste: f64,
}

/// A stored metric record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Metric {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub year: String,
    pub carbon: f64,
    pub water: f64,
    pub waste: f64,
    pub created_at: String,
}

const METRIC_COLUMNS: &str = "id, uuid, user_id, year, carbon, water, waste, created_at";

impl MetricStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert one metric record and return it as stored.
    pub async fn create(&self, user_id: i64, metric: &NewMetric) -> Result<Metric, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let stored = Self::insert(&mut tx, user_id, metric).await?;
        tx.commit().await?;
        Ok(stored)
    }

    /// Insert several records in one transaction. Either all are stored or none.
    pub async fn create_many(
        &self,
        user_id: i64,
        metrics: &[NewMetric],
    ) -> Result<Vec<Metric>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(metrics.len());
        for metric in metrics {
            stored.push(Self::insert(&mut tx, user_id, metric).await?);
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
        metric: &NewMetric,
    ) -> Result<Metric, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query_as::<_, Metric>(&format!(
            "INSERT INTO metrics (uuid, user_id, year, carbon, water, waste)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {METRIC_COLUMNS}"
        ))
        .bind(&uuid)
        .bind(user_id)
        .bind(&metric.year)
        .bind(metric.carbon)
        .bind(metric.water)
        .bind(metric.waste)
        .fetch_one(&mut **tx)
        .await
    }

    /// List a user's metrics ordered by year, then insertion order.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Metric>, sqlx::Error> {
        sqlx::query_as::<_, Metric>(&format!(
            "SELECT {METRIC_COLUMNS} FROM metrics WHERE user_id = ? ORDER BY year, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
