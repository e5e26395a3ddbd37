//! Metric endpoints.
//!
//! - POST `/metrix` - Store one metric record, or a batch under `{metrics: [...]}`
//! - GET `/metrix` - List the caller's metric records

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ApiJson, ResultExt};
use crate::auth::{ApiAuth, AuthError, AuthenticatedUser};
use crate::db::{Database, Metric, NewMetric, User};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

const MAX_YEAR_LENGTH: usize = 16;

#[derive(Clone)]
pub struct MetricsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(MetricsState);

pub fn router(state: MetricsState) -> Router {
    Router::new()
        .route("/metrix", get(list_metrics).post(create_metrics))
        .with_state(state)
}

/// Metric record as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricResponse {
    id: String,
    user_id: String,
    year: String,
    carbon: f64,
    water: f64,
    waste: f64,
    created_at: String,
}

impl MetricResponse {
    fn new(metric: Metric, user_uuid: &str) -> Self {
        Self {
            id: metric.uuid,
            user_id: user_uuid.to_string(),
            year: metric.year,
            carbon: metric.carbon,
            water: metric.water,
            waste: metric.waste,
            created_at: metric.created_at,
        }
    }
}

#[derive(Serialize)]
struct CreateMetricResponse {
    metric: MetricResponse,
    success: bool,
}

#[derive(Serialize)]
struct CreateMetricsResponse {
    metrics: Vec<MetricResponse>,
    success: bool,
}

#[derive(Serialize)]
struct ListMetricsResponse {
    metrics: Vec<MetricResponse>,
}

/// Request body shapes accepted by POST `/metrix`.
#[derive(Debug, PartialEq)]
enum MetricPayload {
    Single(NewMetric),
    Batch(Vec<NewMetric>),
}

fn parse_amount(body: &Value, field: &str) -> Result<f64, String> {
    match body.get(field).and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(format!("{field} must be a non-negative number")),
    }
}

fn parse_metric(body: &Value) -> Result<NewMetric, String> {
    if !body.is_object() {
        return Err("metric must be an object".into());
    }

    let year = match body.get("year").and_then(Value::as_str).map(str::trim) {
        Some(year) if !year.is_empty() && year.chars().count() <= MAX_YEAR_LENGTH => year,
        _ => {
            return Err(format!(
                "year must be a non-empty string of at most {MAX_YEAR_LENGTH} characters"
            ));
        }
    };

    Ok(NewMetric {
        year: year.to_string(),
        carbon: parse_amount(body, "carbon")?,
        water: parse_amount(body, "water")?,
        waste: parse_amount(body, "waste")?,
    })
}

fn parse_payload(body: &Value) -> Result<MetricPayload, String> {
    let Some(batch) = body.get("metrics") else {
        return parse_metric(body).map(MetricPayload::Single);
    };

    let entries = batch
        .as_array()
        .ok_or_else(|| "metrics must be an array".to_string())?;
    if entries.is_empty() {
        return Err("metrics must not be empty".into());
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_metric(entry).map_err(|e| format!("metrics[{i}]: {e}")))
        .collect::<Result<Vec<_>, _>>()
        .map(MetricPayload::Batch)
}

/// Resolve the token subject to a stored user. A valid token for a deleted
/// account is treated as unauthenticated.
async fn current_user(db: &Database, auth: &AuthenticatedUser) -> Result<User, ApiError> {
    db.users()
        .get_by_uuid(auth.user_uuid())
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| AuthError::Unauthenticated("User not found").into())
}

async fn create_metrics(
    State(state): State<MetricsState>,
    ApiAuth(auth): ApiAuth,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_payload(&body).map_err(ApiError::bad_request)?;
    let user = current_user(&state.db, &auth).await?;

    let response = match payload {
        MetricPayload::Single(metric) => {
            let stored = state
                .db
                .metrics()
                .create(user.id, &metric)
                .await
                .db_err("Failed to store metric")?;
            info!(user = %user.uuid, year = %stored.year, "Metric stored");

            Json(CreateMetricResponse {
                metric: MetricResponse::new(stored, &user.uuid),
                success: true,
            })
            .into_response()
        }
        MetricPayload::Batch(metrics) => {
            let stored = state
                .db
                .metrics()
                .create_many(user.id, &metrics)
                .await
                .db_err("Failed to store metrics")?;
            info!(user = %user.uuid, count = stored.len(), "Metric batch stored");

            Json(CreateMetricsResponse {
                metrics: stored
                    .into_iter()
                    .map(|m| MetricResponse::new(m, &user.uuid))
                    .collect(),
                success: true,
            })
            .into_response()
        }
    };

    Ok((StatusCode::CREATED, response))
}

async fn list_metrics(
    State(state): State<MetricsState>,
    ApiAuth(auth): ApiAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state.db, &auth).await?;

    let metrics = state
        .db
        .metrics()
        .list_by_user(user.id)
        .await
        .db_err("Failed to list metrics")?;

    Ok(Json(ListMetricsResponse {
        metrics: metrics
            .into_iter()
            .map(|m| MetricResponse::new(m, &user.uuid))
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metric(year: &str, carbon: f64, water: f64, waste: f64) -> NewMetric {
        NewMetric {
            year: year.to_string(),
            carbon,
            water,
            waste,
        }
    }

    #[test]
    fn test_parse_single() {
        let body = json!({"carbon": 10, "water": 20.5, "waste": 0, "year": "2023"});
        assert_eq!(
            parse_payload(&body),
            Ok(MetricPayload::Single(metric("2023", 10.0, 20.5, 0.0)))
        );
    }

    #[test]
    fn test_parse_batch() {
        let body = json!({"metrics": [
            {"carbon": 1, "water": 2, "waste": 3, "year": "2021"},
            {"carbon": 4, "water": 5, "waste": 6, "year": "2022"},
        ]});
        assert_eq!(
            parse_payload(&body),
            Ok(MetricPayload::Batch(vec![
                metric("2021", 1.0, 2.0, 3.0),
                metric("2022", 4.0, 5.0, 6.0),
            ]))
        );
    }

    #[test]
    fn test_field_errors() {
        let err = parse_payload(&json!({"carbon": -1, "water": 2, "waste": 3, "year": "2021"}));
        assert_eq!(err, Err("carbon must be a non-negative number".into()));

        let err = parse_payload(&json!({"carbon": 1, "water": "2", "waste": 3, "year": "2021"}));
        assert_eq!(err, Err("water must be a non-negative number".into()));

        let err = parse_payload(&json!({"carbon": 1, "water": 2, "year": "2021"}));
        assert_eq!(err, Err("waste must be a non-negative number".into()));

        let err = parse_payload(&json!({"carbon": 1, "water": 2, "waste": 3, "year": 2021}));
        assert!(err.unwrap_err().starts_with("year must be"));

        let err = parse_payload(&json!({"carbon": 1, "water": 2, "waste": 3, "year": "  "}));
        assert!(err.unwrap_err().starts_with("year must be"));

        let long = "x".repeat(MAX_YEAR_LENGTH + 1);
        let err = parse_payload(&json!({"carbon": 1, "water": 2, "waste": 3, "year": long}));
        assert!(err.unwrap_err().starts_with("year must be"));

        assert_eq!(
            parse_payload(&json!([1, 2])),
            Err("metric must be an object".into())
        );
    }

    #[test]
    fn test_batch_errors_name_the_entry() {
        let body = json!({"metrics": [
            {"carbon": 1, "water": 2, "waste": 3, "year": "2021"},
            {"carbon": 1, "water": 2, "waste": -3, "year": "2022"},
        ]});
        assert_eq!(
            parse_payload(&body),
            Err("metrics[1]: waste must be a non-negative number".into())
        );

        assert_eq!(
            parse_payload(&json!({"metrics": []})),
            Err("metrics must not be empty".into())
        );
        assert_eq!(
            parse_payload(&json!({"metrics": {"year": "2021"}})),
            Err("metrics must be an array".into())
        );
    }
}
