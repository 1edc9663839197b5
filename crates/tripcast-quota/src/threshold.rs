// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Near-limit warning shared by all quota backends.

use chrono::NaiveDate;
use tracing::warn;

/// Share of the daily limit at which operators are warned.
pub const WARN_RATIO: f64 = 0.8;

/// True when moving from `before` to `after` crosses the warning threshold.
pub fn crosses_warn_threshold(before: u64, after: u64, limit: u64) -> bool {
    if limit == 0 {
        return false;
    }
    let threshold = limit as f64 * WARN_RATIO;
    (before as f64) < threshold && (after as f64) >= threshold
}

/// Publishes the counter and warns once per crossing of the threshold.
pub(crate) fn observe_count(key: &str, date: NaiveDate, before: u64, after: u64, limit: u64) {
    metrics::gauge!("tripcast_quota_used", "quota_key" => key.to_string()).set(after as f64);
    if crosses_warn_threshold(before, after, limit) {
        warn!(
            quota_key = key,
            %date,
            sent_count = after,
            limit,
            "approaching daily send limit (80%+)"
        );
    }
}
