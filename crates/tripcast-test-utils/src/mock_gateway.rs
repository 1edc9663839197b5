// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! `MockGateway` implements `GatewayAdapter` with scripted outcomes and
//! records every send, so tests can assert exactly which numbers were
//! contacted and how often.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tripcast_core::traits::adapter::PluginAdapter;
use tripcast_core::traits::gateway::GatewayAdapter;
use tripcast_core::types::{AdapterType, GatewayOutcome, HealthStatus, TemplateMessage};
use tripcast_core::TripcastError;

/// One captured gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub phone: String,
    pub message: TemplateMessage,
}

/// A mock gateway that replays scripted outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty the
/// default outcome is returned; without a default, every call succeeds with
/// a numbered provider id (`mock-1`, `mock-2`, ...).
pub struct MockGateway {
    outcomes: Mutex<VecDeque<GatewayOutcome>>,
    default_outcome: Mutex<Option<GatewayOutcome>>,
    sends: Mutex<Vec<RecordedSend>>,
    usage: Mutex<Option<u64>>,
    latency: Option<Duration>,
}

impl MockGateway {
    /// Create a mock gateway that accepts every message.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_outcome: Mutex::new(None),
            sends: Mutex::new(Vec::new()),
            usage: Mutex::new(None),
            latency: None,
        }
    }

    /// Create a mock gateway pre-loaded with the given outcomes.
    pub fn with_outcomes(outcomes: Vec<GatewayOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::from(outcomes)),
            ..Self::new()
        }
    }

    /// Sleep this long inside every send, to widen race windows.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add an outcome to the end of the queue.
    pub async fn push_outcome(&self, outcome: GatewayOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Outcome used once the queue is drained.
    pub async fn set_default_outcome(&self, outcome: GatewayOutcome) {
        *self.default_outcome.lock().await = Some(outcome);
    }

    /// Value reported by `daily_usage`.
    pub async fn set_usage(&self, usage: Option<u64>) {
        *self.usage.lock().await = usage;
    }

    /// Number of send calls so far.
    pub async fn call_count(&self) -> usize {
        self.sends.lock().await.len()
    }

    /// Every send so far, in call order.
    pub async fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().await.clone()
    }

    /// Phones contacted so far, in call order.
    pub async fn sent_phones(&self) -> Vec<String> {
        self.sends
            .lock()
            .await
            .iter()
            .map(|s| s.phone.clone())
            .collect()
    }

    async fn next_outcome(&self, call_number: usize) -> GatewayOutcome {
        if let Some(outcome) = self.outcomes.lock().await.pop_front() {
            return outcome;
        }
        match self.default_outcome.lock().await.as_ref() {
            Some(outcome) => outcome.clone(),
            None => GatewayOutcome::Sent {
                provider_message_id: format!("mock-{call_number}"),
            },
        }
    }

    /// Shorthand for an accepted outcome.
    pub fn sent(provider_message_id: &str) -> GatewayOutcome {
        GatewayOutcome::Sent {
            provider_message_id: provider_message_id.to_string(),
        }
    }

    /// Shorthand for a retryable failure.
    pub fn failed(reason: &str) -> GatewayOutcome {
        GatewayOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a template-not-provisioned response.
    pub fn template_required(detail: &str) -> GatewayOutcome {
        GatewayOutcome::TemplateRequired {
            detail: detail.to_string(),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, TripcastError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TripcastError> {
        Ok(())
    }
}

#[async_trait]
impl GatewayAdapter for MockGateway {
    async fn send(&self, phone: &str, message: &TemplateMessage) -> GatewayOutcome {
        let call_number = {
            let mut sends = self.sends.lock().await;
            sends.push(RecordedSend {
                phone: phone.to_string(),
                message: message.clone(),
            });
            sends.len()
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_outcome(call_number).await
    }

    async fn daily_usage(&self) -> Result<Option<u64>, TripcastError> {
        Ok(*self.usage.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> TemplateMessage {
        TemplateMessage {
            template_name: "trip_coupon".into(),
            params: vec!["Asha".into()],
            media_url: None,
        }
    }

    #[tokio::test]
    async fn scripted_outcomes_then_default() {
        let gateway = MockGateway::with_outcomes(vec![MockGateway::failed("boom")]);
        assert_eq!(
            gateway.send("+919900408817", &message()).await,
            MockGateway::failed("boom")
        );
        assert_eq!(
            gateway.send("+919900408818", &message()).await,
            MockGateway::sent("mock-2")
        );
        assert_eq!(
            gateway.sent_phones().await,
            vec!["+919900408817".to_string(), "+919900408818".to_string()]
        );
    }

    #[tokio::test]
    async fn default_outcome_applies_after_queue() {
        let gateway = MockGateway::new();
        gateway
            .set_default_outcome(MockGateway::template_required("not approved"))
            .await;
        assert_eq!(
            gateway.send("+919900408817", &message()).await,
            MockGateway::template_required("not approved")
        );
        assert_eq!(gateway.call_count().await, 1);
    }

    #[tokio::test]
    async fn usage_is_none_until_set() {
        let gateway = MockGateway::new();
        assert_eq!(gateway.daily_usage().await.unwrap(), None);
        gateway.set_usage(Some(42)).await;
        assert_eq!(gateway.daily_usage().await.unwrap(), Some(42));
    }
}
