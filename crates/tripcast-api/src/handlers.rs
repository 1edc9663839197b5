// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Per-record delivery problems are reported inside the JSON bodies; only
//! store, configuration and lookup errors turn into non-2xx responses.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tripcast_core::{HealthStatus, PluginAdapter, TripcastError};
use tripcast_dispatch::{DispatchSummary, RetrySummary, SingleDispatchResult};
use tripcast_quota::{UsageSnapshot, parse_date};
use tripcast_report::{BatchSummary, DaySummary, RetryHistogram};

use crate::error::ApiError;
use crate::server::ApiState;

/// Request body for POST /v1/uploads/{upload_id}/dispatch.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchRequest {
    /// Replaces the free-text template parameter for this batch.
    #[serde(default)]
    pub message_override: Option<String>,
}

/// Request body for POST /v1/uploads/{upload_id}/retry.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryRequest {
    /// Retry ceiling for this call instead of `retry.max_retries`.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Request body for PUT /v1/travelers/{traveler_id}/phone.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhoneRequest {
    pub phone: String,
}

/// `?date=YYYY-MM-DD&agency=...`
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
}

/// Response body for POST /v1/uploads/{upload_id}/requeue-templates.
#[derive(Debug, Serialize)]
pub struct RequeueResponse {
    pub requeued: u64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `degraded` or `unhealthy`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Optional JSON body: an empty body means all defaults.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError(TripcastError::Validation(format!("invalid request body: {e}")))
    })
}

/// POST /v1/uploads/{upload_id}/dispatch
pub async fn post_dispatch_batch(
    State(state): State<ApiState>,
    Path(upload_id): Path<String>,
    body: Bytes,
) -> Result<Json<DispatchSummary>, ApiError> {
    let request: DispatchRequest = optional_body(&body)?;
    let summary = state
        .dispatcher
        .dispatch_batch(&upload_id, request.message_override.as_deref())
        .await?;
    Ok(Json(summary))
}

/// POST /v1/travelers/{traveler_id}/dispatch
pub async fn post_dispatch_single(
    State(state): State<ApiState>,
    Path(traveler_id): Path<String>,
) -> Result<Json<SingleDispatchResult>, ApiError> {
    Ok(Json(state.dispatcher.dispatch_single(&traveler_id).await?))
}

/// PUT /v1/travelers/{traveler_id}/phone
pub async fn put_traveler_phone(
    State(state): State<ApiState>,
    Path(traveler_id): Path<String>,
    Json(request): Json<PhoneRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .dispatcher
        .correct_phone(&traveler_id, &request.phone)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/uploads/{upload_id}/retry
pub async fn post_retry_failed(
    State(state): State<ApiState>,
    Path(upload_id): Path<String>,
    body: Bytes,
) -> Result<Json<RetrySummary>, ApiError> {
    let request: RetryRequest = optional_body(&body)?;
    Ok(Json(
        state
            .retry
            .retry_failed(&upload_id, request.max_attempts)
            .await?,
    ))
}

/// POST /v1/uploads/{upload_id}/requeue-templates
pub async fn post_requeue_templates(
    State(state): State<ApiState>,
    Path(upload_id): Path<String>,
) -> Result<Json<RequeueResponse>, ApiError> {
    let requeued = state.retry.requeue_template_required(&upload_id).await?;
    Ok(Json(RequeueResponse { requeued }))
}

/// GET /v1/uploads/{upload_id}/status
pub async fn get_batch_status(
    State(state): State<ApiState>,
    Path(upload_id): Path<String>,
) -> Result<Json<BatchSummary>, ApiError> {
    Ok(Json(state.reporter.batch_status(&upload_id).await?))
}

/// GET /v1/usage?date=YYYY-MM-DD
///
/// Defaults to today in the quota calendar.
pub async fn get_daily_usage(
    State(state): State<ApiState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<UsageSnapshot>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => state.reporter.calendar().today(),
    };
    Ok(Json(
        state
            .reporter
            .daily_usage(date, query.agency.as_deref())
            .await?,
    ))
}

/// GET /v1/analytics/retries?date=YYYY-MM-DD
pub async fn get_retry_analytics(
    State(state): State<ApiState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<RetryHistogram>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => state.reporter.calendar().today(),
    };
    Ok(Json(state.reporter.retry_analytics(date).await?))
}

/// GET /v1/days/{date}/summary
pub async fn get_day_summary(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> Result<Json<DaySummary>, ApiError> {
    let date = parse_date(&date)?;
    Ok(Json(state.reporter.day_summary(date).await?))
}

/// GET /health
///
/// 200 while the store answers, 503 otherwise.
pub async fn get_public_health(State(state): State<ApiState>) -> Response {
    let (code, status, detail) = match state.health.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", None),
        Ok(HealthStatus::Degraded(why)) => (StatusCode::OK, "degraded", Some(why)),
        Ok(HealthStatus::Unhealthy(why)) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(why)),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(e.to_string())),
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        detail,
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
///
/// Prometheus text format; 404 when the exporter is disabled.
pub async fn get_public_metrics(State(state): State<ApiState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
