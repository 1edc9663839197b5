// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the dispatch pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Gateway,
    Quota,
    Observability,
}

/// Delivery state of a single traveler message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Ingested, never attempted (or released untouched by a quota stop).
    Pending,
    /// The gateway accepted the message. Terminal.
    Sent,
    /// Last attempt failed; eligible for retry below the retry ceiling.
    Failed,
    /// The agency template is not provisioned. Needs operator action.
    TemplateRequired,
}

/// One traveler-trip-coupon row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelerMessage {
    pub id: String,
    pub agency_id: String,
    pub bus_id: String,
    pub upload_id: String,
    /// Zero-based index in the uploaded roster; dispatch order.
    pub position: i64,
    pub traveler_name: String,
    /// Phone as uploaded. Normalized before every send attempt.
    pub phone: String,
    pub coupon_code: String,
    pub travel_date: String,
    pub delivery_status: DeliveryStatus,
    pub retry_count: u32,
    pub last_attempt_at: Option<String>,
    pub last_error: Option<String>,
    pub provider_message_id: Option<String>,
    /// Failed by local phone validation. Left out of automatic retries
    /// until the phone is corrected.
    #[serde(default)]
    pub rejected_locally: bool,
    pub created_at: String,
}

/// A roster row handed over by upload ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTraveler {
    pub traveler_name: String,
    pub phone: String,
    pub coupon_code: String,
    pub travel_date: String,
}

/// Logical grouping of traveler messages created by one upload event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadBatch {
    pub upload_id: String,
    pub agency_id: String,
    pub bus_id: String,
    pub file_name: String,
    /// Calendar date of the upload (`YYYY-MM-DD`).
    pub upload_date: String,
    #[serde(default)]
    pub created_at: String,
}

/// A fully rendered template send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMessage {
    pub template_name: String,
    /// Positional template parameters, in template order.
    pub params: Vec<String>,
    /// Optional header image.
    pub media_url: Option<String>,
}

/// Classified result of one gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Gateway returned its success token.
    Sent { provider_message_id: String },
    /// Error token, transport failure, non-2xx or timeout. Retry-eligible.
    Failed { reason: String },
    /// Template not provisioned or not approved. Never auto-retried.
    TemplateRequired { detail: String },
}

/// Opaque token proving ownership of a claimed traveler record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimToken(pub String);

/// Final write applied to a claimed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryUpdate {
    /// Mark `Sent`, clear `last_error`.
    Sent { provider_message_id: String },
    /// Mark `Failed`. `gateway_attempt` is false for local validation
    /// failures, which never reached the gateway and do not count as attempts.
    Failed { error: String, gateway_attempt: bool },
    /// Mark `TemplateRequired`; retry count untouched.
    TemplateRequired { error: String },
}

impl DeliveryUpdate {
    /// The status this update writes.
    pub fn status(&self) -> DeliveryStatus {
        match self {
            Self::Sent { .. } => DeliveryStatus::Sent,
            Self::Failed { .. } => DeliveryStatus::Failed,
            Self::TemplateRequired { .. } => DeliveryStatus::TemplateRequired,
        }
    }
}

/// Send counter for one quota key on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    pub quota_key: String,
    pub date: NaiveDate,
    pub sent_count: u64,
    pub estimated_limit: u64,
}

impl DailyQuota {
    /// Slots left today.
    pub fn remaining(&self) -> u64 {
        self.estimated_limit.saturating_sub(self.sent_count)
    }

    /// Used share of the limit in percent, rounded to two decimals.
    pub fn percentage(&self) -> f64 {
        if self.estimated_limit == 0 {
            return 100.0;
        }
        let pct = self.sent_count as f64 * 100.0 / self.estimated_limit as f64;
        (pct * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn delivery_status_round_trips_through_strings() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Sent,
            DeliveryStatus::Failed,
            DeliveryStatus::TemplateRequired,
        ] {
            let s = status.to_string();
            assert_eq!(DeliveryStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(DeliveryStatus::TemplateRequired.to_string(), "template_required");
    }

    #[test]
    fn delivery_status_serializes_snake_case() {
        let json = serde_json::to_string(&DeliveryStatus::TemplateRequired).unwrap();
        assert_eq!(json, "\"template_required\"");
    }

    #[test]
    fn delivery_update_reports_target_status() {
        let update = DeliveryUpdate::Failed {
            error: "boom".into(),
            gateway_attempt: true,
        };
        assert_eq!(update.status(), DeliveryStatus::Failed);
    }

    #[test]
    fn daily_quota_remaining_and_percentage() {
        let quota = DailyQuota {
            quota_key: "global".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            sent_count: 250,
            estimated_limit: 1000,
        };
        assert_eq!(quota.remaining(), 750);
        assert!((quota.percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_quota_zero_limit_is_full() {
        let quota = DailyQuota {
            quota_key: "global".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            sent_count: 0,
            estimated_limit: 0,
        };
        assert_eq!(quota.remaining(), 0);
        assert!((quota.percentage() - 100.0).abs() < f64::EPSILON);
    }
}
