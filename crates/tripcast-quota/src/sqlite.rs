// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent daily quota tracker backed by the `daily_quota` table.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use tripcast_core::{DailyQuota, QuotaTracker, TripcastError};
use tripcast_storage::Database;
use tripcast_storage::queries::quota;

use crate::threshold::observe_count;

/// Quota tracker whose counters survive restarts and are shared by every
/// process using the same database file.
pub struct SqliteQuota {
    db: Database,
    limit: u64,
}

impl SqliteQuota {
    /// Create a tracker over an open database.
    pub fn new(db: Database, limit: u64) -> Self {
        Self { db, limit }
    }
}

fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl QuotaTracker for SqliteQuota {
    async fn try_reserve(&self, key: &str, date: NaiveDate, n: u64) -> Result<bool, TripcastError> {
        match quota::try_reserve(&self.db, key, &day_key(date), n, self.limit).await? {
            Some(after) => {
                observe_count(key, date, after.saturating_sub(n), after, self.limit);
                Ok(true)
            }
            None => {
                debug!(quota_key = key, %date, n, limit = self.limit, "reservation refused");
                Ok(false)
            }
        }
    }

    async fn usage(&self, key: &str, date: NaiveDate) -> Result<DailyQuota, TripcastError> {
        let sent_count = quota::get(&self.db, key, &day_key(date))
            .await?
            .map_or(0, |row| row.sent_count);
        Ok(DailyQuota {
            quota_key: key.to_string(),
            date,
            sent_count,
            estimated_limit: self.limit,
        })
    }

    async fn observe_external(
        &self,
        key: &str,
        date: NaiveDate,
        count: u64,
    ) -> Result<(), TripcastError> {
        let day = day_key(date);
        let before = quota::get(&self.db, key, &day)
            .await?
            .map_or(0, |row| row.sent_count);
        let after = quota::raise_to(&self.db, key, &day, count, self.limit).await?;
        if after > before {
            observe_count(key, date, before, after, self.limit);
        }
        Ok(())
    }
}
