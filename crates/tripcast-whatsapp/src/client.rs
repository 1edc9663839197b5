// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the template messaging gateway.
//!
//! One [`WhatsAppClient::send_template`] call is exactly one GET request.
//! There is no retry here: retries are a dispatcher decision, and the
//! gateway bills every request it receives.

use std::time::{Duration, Instant};

use tracing::{debug, warn};
use tripcast_config::model::GatewayConfig;
use tripcast_core::{GatewayOutcome, TemplateMessage, TripcastError, mask_phone};

use crate::response::{ResponseRules, classify_response, parse_usage};

/// The gateway splits `dvariables` on this character.
const PARAM_SEPARATOR: char = ',';

/// HTTP client for gateway communication.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    usage_url: Option<String>,
    timeout: Duration,
    rules: ResponseRules,
}

impl WhatsAppClient {
    /// Builds a client from the `[gateway]` section.
    ///
    /// Fails with [`TripcastError::Config`] when `base_url` or `api_key`
    /// is missing.
    pub fn new(config: &GatewayConfig) -> Result<Self, TripcastError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| TripcastError::Config("gateway.base_url is not set".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| TripcastError::Config("gateway.api_key is not set".to_string()))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TripcastError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            usage_url: config.usage_url.clone(),
            timeout,
            rules: ResponseRules {
                success_prefix: config.success_prefix.clone(),
                template_marker: config.template_required_marker.clone(),
            },
        })
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one template message. `phone` is in `+<digits>` form.
    pub async fn send_template(&self, phone: &str, message: &TemplateMessage) -> GatewayOutcome {
        let mobile = phone.trim_start_matches('+');
        let variables = encode_variables(&message.params);
        let mut query: Vec<(&str, &str)> = vec![
            ("apikey", self.api_key.as_str()),
            ("mobile", mobile),
            ("templatename", message.template_name.as_str()),
            ("dvariables", variables.as_str()),
        ];
        if let Some(media) = message.media_url.as_deref() {
            query.push(("media", media));
        }

        let started = Instant::now();
        let result = self.client.get(&self.base_url).query(&query).send().await;
        let outcome = match result {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => classify_response(status, &body, &self.rules),
                    Err(e) => failure_from_transport(&e),
                }
            }
            Err(e) => failure_from_transport(&e),
        };
        metrics::histogram!("tripcast_gateway_latency_seconds")
            .record(started.elapsed().as_secs_f64());

        match &outcome {
            GatewayOutcome::Sent { provider_message_id } => {
                debug!(phone = %mask_phone(phone), %provider_message_id, "gateway accepted message");
            }
            GatewayOutcome::Failed { reason } => {
                warn!(phone = %mask_phone(phone), %reason, "gateway send failed");
            }
            GatewayOutcome::TemplateRequired { detail } => {
                warn!(
                    phone = %mask_phone(phone),
                    template = %message.template_name,
                    %detail,
                    "gateway reports template not provisioned"
                );
            }
        }
        outcome
    }

    /// Today's sent count as reported by the provider, if a usage endpoint
    /// is configured and answers with a number.
    pub async fn fetch_usage(&self) -> Result<Option<u64>, TripcastError> {
        let Some(url) = self.usage_url.as_deref() else {
            return Ok(None);
        };
        let response = self
            .client
            .get(url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| TripcastError::Gateway {
                message: format!("usage request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TripcastError::Gateway {
                message: format!("usage endpoint returned {status}"),
                source: None,
            });
        }
        let body = response.text().await.map_err(|e| TripcastError::Gateway {
            message: format!("failed to read usage body: {e}"),
            source: Some(Box::new(e)),
        })?;

        let usage = parse_usage(&body);
        if usage.is_none() {
            warn!(body = %body.trim(), "unparsable usage response");
        }
        Ok(usage)
    }
}

fn failure_from_transport(e: &reqwest::Error) -> GatewayOutcome {
    let reason = if e.is_timeout() {
        "timeout".to_string()
    } else {
        format!("transport error: {e}")
    };
    GatewayOutcome::Failed { reason }
}

/// Joins positional parameters for `dvariables`.
///
/// A separator inside a value would shift every later slot, so it becomes a
/// single space (`"Rao, K"` is sent as `"Rao K"`). The slot count always
/// equals `params.len()`.
fn encode_variables(params: &[String]) -> String {
    let mut encoded = String::new();
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            encoded.push(PARAM_SEPARATOR);
        }
        let mut pieces = param
            .split(PARAM_SEPARATOR)
            .map(str::trim)
            .filter(|piece| !piece.is_empty());
        if let Some(first) = pieces.next() {
            encoded.push_str(first);
            for piece in pieces {
                encoded.push(' ');
                encoded.push_str(piece);
            }
        }
    }
    encoded
}
