// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway response classification.
//!
//! The gateway answers every send with a short text body. An accepted
//! message starts with the success token followed by the provider message id.
//! Anything else is an error text; error texts that mention the template
//! marker mean the agency template is not provisioned, which retrying cannot
//! fix.

use serde::Deserialize;
use tripcast_core::GatewayOutcome;

/// Longest slice of a response body kept in a failure reason.
const MAX_REASON_LEN: usize = 200;

/// Tokens that decide how a response body is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRules {
    /// Prefix of an accepted-message body, e.g. `S.`.
    pub success_prefix: String,
    /// Case-insensitive substring of a template-not-provisioned error.
    pub template_marker: String,
}

impl Default for ResponseRules {
    fn default() -> Self {
        Self {
            success_prefix: "S.".to_string(),
            template_marker: "template".to_string(),
        }
    }
}

/// Classify one HTTP response from the send endpoint.
pub fn classify_response(status: u16, body: &str, rules: &ResponseRules) -> GatewayOutcome {
    let body = body.trim();

    if !(200..300).contains(&status) {
        return GatewayOutcome::Failed {
            reason: format!("HTTP {status}: {}", truncate(body)),
        };
    }

    if let Some(rest) = body.strip_prefix(rules.success_prefix.as_str()) {
        let id = rest.trim();
        return GatewayOutcome::Sent {
            provider_message_id: if id.is_empty() { body.to_string() } else { id.to_string() },
        };
    }

    if body.is_empty() {
        return GatewayOutcome::Failed {
            reason: "empty gateway response".to_string(),
        };
    }

    if !rules.template_marker.is_empty()
        && body
            .to_lowercase()
            .contains(&rules.template_marker.to_lowercase())
    {
        return GatewayOutcome::TemplateRequired {
            detail: truncate(body),
        };
    }

    GatewayOutcome::Failed {
        reason: truncate(body),
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_REASON_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[derive(Deserialize)]
struct UsageBody {
    sent_today: u64,
}

/// Parse the usage endpoint body: a bare integer or `{"sent_today": n}`.
pub fn parse_usage(body: &str) -> Option<u64> {
    let body = body.trim();
    body.parse::<u64>().ok().or_else(|| {
        serde_json::from_str::<UsageBody>(body)
            .ok()
            .map(|u| u.sent_today)
    })
}
