// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store-backed reporter.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use tripcast_config::model::{QuotaScope, TripcastConfig};
use tripcast_core::{QuotaTracker, StorageAdapter, TripcastError};
use tripcast_quota::{GLOBAL_KEY, QuotaCalendar, UsageSnapshot, quota_key};

use crate::histogram::{RetryHistogram, retry_histogram};
use crate::summary::{BatchSummary, DaySummary, summarize_batch, summarize_day};

/// Read-only view over the record store and the quota tracker.
pub struct Reporter {
    storage: Arc<dyn StorageAdapter>,
    quota: Arc<dyn QuotaTracker>,
    calendar: QuotaCalendar,
    scope: QuotaScope,
}

impl Reporter {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        quota: Arc<dyn QuotaTracker>,
        calendar: QuotaCalendar,
        scope: QuotaScope,
    ) -> Self {
        Self {
            storage,
            quota,
            calendar,
            scope,
        }
    }

    pub fn from_config(
        config: &TripcastConfig,
        storage: Arc<dyn StorageAdapter>,
        quota: Arc<dyn QuotaTracker>,
    ) -> Result<Self, TripcastError> {
        Ok(Self::new(
            storage,
            quota,
            QuotaCalendar::new(config.quota.utc_offset_minutes)?,
            config.quota.scope,
        ))
    }

    pub fn calendar(&self) -> &QuotaCalendar {
        &self.calendar
    }

    /// Derived counts of one upload.
    pub async fn batch_status(&self, upload_id: &str) -> Result<BatchSummary, TripcastError> {
        let batch = self
            .storage
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| TripcastError::upload_not_found(upload_id))?;
        let records = self.storage.list_travelers(upload_id).await?;
        Ok(summarize_batch(&batch, &records))
    }

    /// Uploads dated `date` and their delivery state.
    pub async fn day_summary(&self, date: NaiveDate) -> Result<DaySummary, TripcastError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let batches = self.storage.list_uploads_on(&date_str).await?;
        let mut records = Vec::new();
        for batch in &batches {
            records.extend(self.storage.list_travelers(&batch.upload_id).await?);
        }
        debug!(date = %date_str, uploads = batches.len(), records = records.len(), "day summary loaded");
        Ok(summarize_day(&date_str, &batches, &records))
    }

    /// Retry histogram over records last attempted on `date`.
    pub async fn retry_analytics(&self, date: NaiveDate) -> Result<RetryHistogram, TripcastError> {
        let (from, until) = self.calendar.day_bounds(date);
        let records = self.storage.list_attempted_between(&from, &until).await?;
        Ok(retry_histogram(&records))
    }

    /// Quota usage on `date`. With per-agency quotas `agency_id` selects the
    /// counter and is required; with a global quota it is ignored.
    pub async fn daily_usage(
        &self,
        date: NaiveDate,
        agency_id: Option<&str>,
    ) -> Result<UsageSnapshot, TripcastError> {
        let key = match (self.scope, agency_id) {
            (QuotaScope::Global, _) => GLOBAL_KEY.to_string(),
            (QuotaScope::Agency, Some(agency_id)) => quota_key(self.scope, agency_id),
            (QuotaScope::Agency, None) => {
                return Err(TripcastError::Validation(
                    "agency is required when quota.scope = agency".to_string(),
                ));
            }
        };
        Ok(self.quota.usage(&key, date).await?.into())
    }
}
