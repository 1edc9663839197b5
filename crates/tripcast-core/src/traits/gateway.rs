// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway adapter trait.

use async_trait::async_trait;

use crate::error::TripcastError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GatewayOutcome, TemplateMessage};

/// Adapter for the outbound messaging gateway.
///
/// One `send` call is exactly one outbound request. Implementations never
/// retry; transport problems come back as [`GatewayOutcome::Failed`].
#[async_trait]
pub trait GatewayAdapter: PluginAdapter {
    /// Sends one template message to a normalized phone number.
    async fn send(&self, phone: &str, message: &TemplateMessage) -> GatewayOutcome;

    /// Messages the provider reports as sent today, if it exposes a usage
    /// endpoint. `Ok(None)` when not available.
    async fn daily_usage(&self) -> Result<Option<u64>, TripcastError>;
}
