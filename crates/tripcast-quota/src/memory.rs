// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory daily quota tracker.
//!
//! Keeps one running counter per quota key and resets it when a reservation
//! arrives for a new calendar day. Counts are lost on restart; use the SQLite
//! tracker when more than one process shares the gateway account.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tripcast_core::{DailyQuota, QuotaTracker, TripcastError};

use crate::threshold::observe_count;

#[derive(Debug, Clone, Copy)]
struct Counter {
    date: NaiveDate,
    sent: u64,
}

/// Mutex-guarded per-key counters with daily rollover.
pub struct MemoryQuota {
    limit: u64,
    counters: Mutex<HashMap<String, Counter>>,
}

impl MemoryQuota {
    /// Create a tracker with zero usage and the given daily limit.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Counter value for `key` on `date`, treating a stale day as zero.
    fn current(counters: &HashMap<String, Counter>, key: &str, date: NaiveDate) -> u64 {
        counters
            .get(key)
            .filter(|c| c.date == date)
            .map_or(0, |c| c.sent)
    }
}

#[async_trait]
impl QuotaTracker for MemoryQuota {
    async fn try_reserve(&self, key: &str, date: NaiveDate, n: u64) -> Result<bool, TripcastError> {
        let mut counters = self.counters.lock().await;
        let before = Self::current(&counters, key, date);
        let Some(after) = before.checked_add(n).filter(|after| *after <= self.limit) else {
            return Ok(false);
        };
        counters.insert(key.to_string(), Counter { date, sent: after });
        drop(counters);

        observe_count(key, date, before, after, self.limit);
        Ok(true)
    }

    async fn usage(&self, key: &str, date: NaiveDate) -> Result<DailyQuota, TripcastError> {
        let counters = self.counters.lock().await;
        Ok(DailyQuota {
            quota_key: key.to_string(),
            date,
            sent_count: Self::current(&counters, key, date),
            estimated_limit: self.limit,
        })
    }

    async fn observe_external(
        &self,
        key: &str,
        date: NaiveDate,
        count: u64,
    ) -> Result<(), TripcastError> {
        let mut counters = self.counters.lock().await;
        let before = Self::current(&counters, key, date);
        if count <= before {
            return Ok(());
        }
        counters.insert(key.to_string(), Counter { date, sent: count });
        drop(counters);

        observe_count(key, date, before, count, self.limit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn reserve_until_limit() {
        let quota = MemoryQuota::new(3);
        for _ in 0..3 {
            assert!(quota.try_reserve("global", day(1), 1).await.unwrap());
        }
        assert!(!quota.try_reserve("global", day(1), 1).await.unwrap());
        assert_eq!(quota.usage("global", day(1)).await.unwrap().sent_count, 3);
    }

    #[tokio::test]
    async fn refused_reservation_does_not_mutate() {
        let quota = MemoryQuota::new(3);
        quota.try_reserve("global", day(1), 2).await.unwrap();
        assert!(!quota.try_reserve("global", day(1), 2).await.unwrap());
        assert_eq!(quota.usage("global", day(1)).await.unwrap().sent_count, 2);
    }

    #[tokio::test]
    async fn new_day_resets_counter() {
        let quota = MemoryQuota::new(1);
        assert!(quota.try_reserve("global", day(1), 1).await.unwrap());
        assert!(quota.try_reserve("global", day(2), 1).await.unwrap());
        assert_eq!(quota.usage("global", day(2)).await.unwrap().sent_count, 1);
    }

    #[tokio::test]
    async fn observe_external_only_raises() {
        let quota = MemoryQuota::new(10);
        quota.try_reserve("global", day(1), 4).await.unwrap();
        quota.observe_external("global", day(1), 2).await.unwrap();
        assert_eq!(quota.usage("global", day(1)).await.unwrap().sent_count, 4);
        quota.observe_external("global", day(1), 9).await.unwrap();
        assert_eq!(quota.usage("global", day(1)).await.unwrap().sent_count, 9);
        assert!(!quota.try_reserve("global", day(1), 2).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_reservers_never_exceed_limit() {
        let quota = Arc::new(MemoryQuota::new(25));
        let mut handles = Vec::new();
        for _ in 0..100 {
            let quota = Arc::clone(&quota);
            handles.push(tokio::spawn(async move {
                quota.try_reserve("global", day(1), 1).await.unwrap()
            }));
        }
        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 25);
        assert_eq!(quota.usage("global", day(1)).await.unwrap().sent_count, 25);
    }
}
