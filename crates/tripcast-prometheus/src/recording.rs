// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric names and descriptions.
//!
//! The dispatch, quota and gateway crates record through the metrics-rs
//! facade directly; this module only describes the series so the exporter
//! renders HELP lines for them.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

pub const MESSAGES_TOTAL: &str = "tripcast_messages_total";
pub const QUOTA_USED: &str = "tripcast_quota_used";
pub const GATEWAY_LATENCY_SECONDS: &str = "tripcast_gateway_latency_seconds";

/// Register all Tripcast metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        MESSAGES_TOTAL,
        "Send attempts by outcome (sent, failed, template_required, invalid_phone, skipped, quota_exhausted)"
    );
    describe_gauge!(QUOTA_USED, "Messages reserved today against the daily limit, by quota key");
    describe_histogram!(
        GATEWAY_LATENCY_SECONDS,
        Unit::Seconds,
        "Messaging gateway round-trip latency"
    );
}
