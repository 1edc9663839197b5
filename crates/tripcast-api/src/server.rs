// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tripcast_core::{StorageAdapter, TripcastError};
use tripcast_dispatch::{Dispatcher, RetryCoordinator};
use tripcast_report::Reporter;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Store probed by `/health`.
    pub storage: Arc<dyn StorageAdapter>,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub retry: Arc<RetryCoordinator>,
    pub reporter: Arc<Reporter>,
    pub health: HealthState,
}

/// API server configuration (mirrors `[api]` from tripcast-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Assemble the router.
///
/// - `GET /health`, `GET /metrics` (no auth)
/// - everything under `/v1` (bearer auth)
pub fn build_router(state: ApiState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/uploads/{upload_id}/dispatch",
            post(handlers::post_dispatch_batch),
        )
        .route(
            "/v1/uploads/{upload_id}/retry",
            post(handlers::post_retry_failed),
        )
        .route(
            "/v1/uploads/{upload_id}/requeue-templates",
            post(handlers::post_requeue_templates),
        )
        .route(
            "/v1/uploads/{upload_id}/status",
            get(handlers::get_batch_status),
        )
        .route(
            "/v1/travelers/{traveler_id}/dispatch",
            post(handlers::post_dispatch_single),
        )
        .route(
            "/v1/travelers/{traveler_id}/phone",
            put(handlers::put_traveler_phone),
        )
        .route("/v1/usage", get(handlers::get_daily_usage))
        .route("/v1/analytics/retries", get(handlers::get_retry_analytics))
        .route("/v1/days/{date}/summary", get(handlers::get_day_summary))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the API server and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: ApiState,
    auth: AuthConfig,
    cancel: CancellationToken,
) -> Result<(), TripcastError> {
    let app = build_router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TripcastError::Internal(format!("failed to bind api to {addr}: {e}")))?;

    tracing::info!("API server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| TripcastError::Internal(format!("api server error: {e}")))?;

    tracing::info!("API server stopped");
    Ok(())
}
