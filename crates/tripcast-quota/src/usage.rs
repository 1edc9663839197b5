// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing view of a day's quota usage.

use serde::Serialize;
use tripcast_core::DailyQuota;

/// `{sent_today, estimated_limit, remaining, percentage}` for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub date: String,
    pub quota_key: String,
    pub sent_today: u64,
    pub estimated_limit: u64,
    pub remaining: u64,
    pub percentage: f64,
}

impl From<DailyQuota> for UsageSnapshot {
    fn from(quota: DailyQuota) -> Self {
        Self {
            date: quota.date.format("%Y-%m-%d").to_string(),
            remaining: quota.remaining(),
            percentage: quota.percentage(),
            sent_today: quota.sent_count,
            estimated_limit: quota.estimated_limit,
            quota_key: quota.quota_key,
        }
    }
}
