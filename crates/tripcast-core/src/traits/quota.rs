// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily send quota trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::TripcastError;
use crate::types::DailyQuota;

/// Atomic per-day send counter with a configured ceiling.
///
/// A slot is reserved *before* each gateway call and never handed back:
/// the gateway bills failed attempts too.
#[async_trait]
pub trait QuotaTracker: Send + Sync + 'static {
    /// Reserves `n` slots on `date` for `key`. Returns `false`, without
    /// mutating anything, if that would exceed the limit.
    async fn try_reserve(&self, key: &str, date: NaiveDate, n: u64)
        -> Result<bool, TripcastError>;

    /// Current counter for `key` on `date` (zero if nothing was reserved).
    async fn usage(&self, key: &str, date: NaiveDate) -> Result<DailyQuota, TripcastError>;

    /// Raises the counter to at least `count`, never lowering it. Used to
    /// fold in an authoritative figure reported by the provider.
    async fn observe_external(
        &self,
        key: &str,
        date: NaiveDate,
        count: u64,
    ) -> Result<(), TripcastError>;
}
