// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-batch and per-day delivery summaries.

use serde::Serialize;
use tripcast_core::{DeliveryStatus, TravelerMessage, UploadBatch};

/// Records per delivery state. Each record lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,
    pub template_required: u64,
}

impl StatusCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a TravelerMessage>) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.delivery_status);
        }
        counts
    }

    fn add(&mut self, status: DeliveryStatus) {
        self.total += 1;
        match status {
            DeliveryStatus::Sent => self.sent += 1,
            DeliveryStatus::Failed => self.failed += 1,
            DeliveryStatus::Pending => self.pending += 1,
            DeliveryStatus::TemplateRequired => self.template_required += 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.sent += other.sent;
        self.failed += other.failed;
        self.pending += other.pending;
        self.template_required += other.template_required;
    }

    /// Share of records that left `Pending`, in percent with two decimals.
    pub fn progress_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let processed = self.total - self.pending;
        let pct = processed as f64 * 100.0 / self.total as f64;
        (pct * 100.0).round() / 100.0
    }
}

/// Derived state of one upload batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub upload_id: String,
    pub agency_id: String,
    pub bus_id: String,
    pub file_name: String,
    pub upload_date: String,
    pub total: u64,
    pub sent_count: u64,
    pub failed_count: u64,
    pub pending_count: u64,
    pub template_required_count: u64,
    pub progress_percentage: f64,
}

/// Summarizes the records of one batch. Records of other batches are ignored.
pub fn summarize_batch(batch: &UploadBatch, records: &[TravelerMessage]) -> BatchSummary {
    let counts = StatusCounts::tally(
        records
            .iter()
            .filter(|r| r.upload_id == batch.upload_id),
    );
    BatchSummary {
        upload_id: batch.upload_id.clone(),
        agency_id: batch.agency_id.clone(),
        bus_id: batch.bus_id.clone(),
        file_name: batch.file_name.clone(),
        upload_date: batch.upload_date.clone(),
        total: counts.total,
        sent_count: counts.sent,
        failed_count: counts.failed,
        pending_count: counts.pending,
        template_required_count: counts.template_required,
        progress_percentage: counts.progress_percentage(),
    }
}

/// Everything uploaded on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub upload_count: u64,
    pub totals: StatusCounts,
    pub progress_percentage: f64,
    pub batches: Vec<BatchSummary>,
}

/// Summarizes `batches` (all dated `date`) and their `records`.
pub fn summarize_day(
    date: &str,
    batches: &[UploadBatch],
    records: &[TravelerMessage],
) -> DaySummary {
    let mut totals = StatusCounts::default();
    let summaries: Vec<BatchSummary> = batches
        .iter()
        .map(|batch| {
            let summary = summarize_batch(batch, records);
            totals.merge(&StatusCounts {
                total: summary.total,
                sent: summary.sent_count,
                failed: summary.failed_count,
                pending: summary.pending_count,
                template_required: summary.template_required_count,
            });
            summary
        })
        .collect();
    DaySummary {
        date: date.to_string(),
        upload_count: summaries.len() as u64,
        progress_percentage: totals.progress_percentage(),
        totals,
        batches: summaries,
    }
}
