// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic background retry sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tripcast_core::TripcastError;

use crate::retry::RetryCoordinator;

/// Totals of one sweep round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub uploads_visited: u64,
    pub retried: u64,
    pub recovered: u64,
    pub limit_reached: bool,
}

/// Retries failed records of every upload on a fixed interval.
pub struct RetrySweep {
    coordinator: Arc<RetryCoordinator>,
    interval: Duration,
}

impl RetrySweep {
    pub fn new(coordinator: Arc<RetryCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    /// One round over all uploads with retryable records, oldest first.
    /// Stops early once the daily limit is reached.
    pub async fn sweep_once(&self) -> Result<SweepReport, TripcastError> {
        let dispatcher = self.coordinator.dispatcher();
        let uploads = dispatcher
            .storage()
            .list_uploads_with_retryable(dispatcher.settings().retry_ceiling)
            .await?;

        let mut report = SweepReport::default();
        for upload_id in uploads {
            let summary = self.coordinator.retry_failed(&upload_id, None).await?;
            report.uploads_visited += 1;
            report.retried += summary.retried_count;
            report.recovered += summary.recovered_count;
            if summary.limit_reached {
                report.limit_reached = true;
                info!(upload_id = %upload_id, "daily send limit reached, ending sweep round");
                break;
            }
        }
        Ok(report)
    }

    /// Runs rounds until `cancel` fires. The first round starts after one
    /// full interval.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;
        info!(interval_secs = self.interval.as_secs(), "retry sweep started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep_once().await {
                        Ok(report) => debug!(?report, "retry sweep round complete"),
                        Err(e) => error!(error = %e, "retry sweep round failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("retry sweep shutting down");
                    break;
                }
            }
        }
    }
}
