// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry coordinator for failed deliveries.
//!
//! Re-enters the dispatcher attempt for `Failed` records below the retry
//! ceiling. `TemplateRequired` records are never selected: they need an
//! operator to fix the template and requeue them.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use tripcast_core::TripcastError;

use crate::dispatcher::Dispatcher;

/// Result of one `retry_failed` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrySummary {
    pub upload_id: String,
    /// Records that got a new gateway attempt (or a local rejection).
    pub retried_count: u64,
    /// Retried records that are still `Failed` after this pass.
    pub still_failed_count: u64,
    pub recovered_count: u64,
    pub template_required_count: u64,
    pub limit_reached: bool,
    /// `Failed` records left out because they reached the ceiling.
    pub excluded_at_ceiling: u64,
}

/// Runs bounded retry passes through a shared [`Dispatcher`].
pub struct RetryCoordinator {
    dispatcher: Arc<Dispatcher>,
}

impl RetryCoordinator {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Retries `Failed` records of an upload whose retry count is below the
    /// ceiling. `max_attempts` replaces the configured ceiling for this call.
    pub async fn retry_failed(
        &self,
        upload_id: &str,
        max_attempts: Option<u32>,
    ) -> Result<RetrySummary, TripcastError> {
        let storage = self.dispatcher.storage();
        let settings = self.dispatcher.settings();
        let batch = storage
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| TripcastError::upload_not_found(upload_id))?;
        let ceiling = max_attempts.unwrap_or(settings.retry_ceiling);

        let records = storage
            .list_retryable(upload_id, ceiling, settings.retry_batch_limit)
            .await?;
        let excluded_at_ceiling = storage.count_at_ceiling(upload_id, ceiling).await?;

        let tally = if records.is_empty() {
            Default::default()
        } else {
            let profile = self.dispatcher.templates().profile(&batch.agency_id)?;
            self.dispatcher.run_pass(&records, &profile, None).await?
        };

        let summary = RetrySummary {
            upload_id: upload_id.to_string(),
            retried_count: tally.attempted(),
            still_failed_count: tally.failed,
            recovered_count: tally.sent,
            template_required_count: tally.template_required,
            limit_reached: tally.limit_reached,
            excluded_at_ceiling,
        };
        info!(
            upload_id,
            ceiling,
            retried = summary.retried_count,
            recovered = summary.recovered_count,
            still_failed = summary.still_failed_count,
            excluded = summary.excluded_at_ceiling,
            "retry pass finished"
        );
        Ok(summary)
    }

    /// Moves `TemplateRequired` records of an upload back to `Pending`
    /// after an operator fixed the agency template.
    pub async fn requeue_template_required(&self, upload_id: &str) -> Result<u64, TripcastError> {
        let storage = self.dispatcher.storage();
        storage
            .get_upload(upload_id)
            .await?
            .ok_or_else(|| TripcastError::upload_not_found(upload_id))?;
        let requeued = storage.requeue_template_required(upload_id).await?;
        info!(upload_id, requeued, "template-required records requeued");
        Ok(requeued)
    }
}
