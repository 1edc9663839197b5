// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp template gateway adapter for the Tripcast dispatch engine.
//!
//! Wraps [`WhatsAppClient`] in the [`GatewayAdapter`] trait. Response
//! classification lives in [`response`] so it can be tested without HTTP.

pub mod client;
pub mod response;

use async_trait::async_trait;
use tracing::debug;
use tripcast_config::model::GatewayConfig;
use tripcast_core::{
    AdapterType, GatewayAdapter, GatewayOutcome, HealthStatus, PluginAdapter, TemplateMessage,
    TripcastError,
};

pub use client::WhatsAppClient;
pub use response::{ResponseRules, classify_response, parse_usage};

/// Gateway adapter over the HTTP template endpoint.
pub struct WhatsAppGateway {
    client: WhatsAppClient,
}

impl WhatsAppGateway {
    /// Creates the adapter from the `[gateway]` configuration section.
    pub fn new(config: &GatewayConfig) -> Result<Self, TripcastError> {
        Ok(Self {
            client: WhatsAppClient::new(config)?,
        })
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppGateway {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, TripcastError> {
        // Probing the send endpoint would bill a message.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TripcastError> {
        debug!("WhatsApp gateway shutting down");
        Ok(())
    }
}

#[async_trait]
impl GatewayAdapter for WhatsAppGateway {
    async fn send(&self, phone: &str, message: &TemplateMessage) -> GatewayOutcome {
        self.client.send_template(phone, message).await
    }

    async fn daily_usage(&self) -> Result<Option<u64>, TripcastError> {
        self.client.fetch_usage().await
    }
}
