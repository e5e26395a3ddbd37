//! Request and response bodies of the HTTP API, as seen by the client.

use serde::{Deserialize, Serialize};

/// A metric entry to submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricInput {
    pub year: String,
    pub carbon: f64,
    pub water: f64,
    pub waste: f64,
}

/// A stored metric record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub id: String,
    pub user_id: String,
    pub year: String,
    pub carbon: f64,
    pub water: f64,
    pub waste: f64,
    pub created_at: String,
}

#[derive(Serialize)]
pub(crate) struct CredentialsBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct MetricBatchBody<'a> {
    pub metrics: &'a [MetricInput],
}

#[derive(Deserialize)]
pub(crate) struct SignUpResponse {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInResponse {
    pub access_token: String,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    pub access_token: String,
}

#[derive(Deserialize)]
pub(crate) struct MetricResponse {
    pub metric: MetricRecord,
}

#[derive(Deserialize)]
pub(crate) struct MetricsResponse {
    pub metrics: Vec<MetricRecord>,
}
