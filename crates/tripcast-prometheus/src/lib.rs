// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics exporter for the Tripcast dispatch engine.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the API's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use tripcast_core::traits::adapter::PluginAdapter;
use tripcast_core::types::{AdapterType, HealthStatus};
use tripcast_core::TripcastError;

pub use recording::register_metrics;

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process; a second call returns an error.
    pub fn new() -> Result<Self, TripcastError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            TripcastError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wraps an existing handle, for recorders installed elsewhere.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, TripcastError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TripcastError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{MESSAGES_TOTAL, QUOTA_USED};

    // A local recorder keeps tests independent of the global one.
    #[test]
    fn described_metrics_render_with_help_lines() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let adapter = PrometheusAdapter::from_handle(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            metrics::counter!(MESSAGES_TOTAL, "outcome" => "sent").increment(2);
            metrics::gauge!(QUOTA_USED, "quota_key" => "global").set(7.0);
        });

        let rendered = adapter.render();
        assert!(rendered.contains("# HELP tripcast_messages_total"));
        assert!(rendered.contains("tripcast_messages_total{outcome=\"sent\"} 2"));
        assert!(rendered.contains("tripcast_quota_used{quota_key=\"global\"} 7"));
    }

    #[tokio::test]
    async fn adapter_reports_healthy() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let adapter = PrometheusAdapter::from_handle(recorder.handle());
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
