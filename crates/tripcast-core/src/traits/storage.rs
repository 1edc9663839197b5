// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the traveler record store.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TripcastError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ClaimToken, DeliveryStatus, DeliveryUpdate, NewTraveler, TravelerMessage, UploadBatch,
};

/// Adapter for the traveler record store.
///
/// Status transitions go through a claim/complete pair: [`claim`] is an
/// optimistic compare-and-set on the record's current status and retry count,
/// and [`complete`] only lands while the claim token still matches. Two
/// overlapping dispatches can therefore never both send the same record.
///
/// [`claim`]: StorageAdapter::claim
/// [`complete`]: StorageAdapter::complete
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend (migrations, connection setup).
    async fn initialize(&self) -> Result<(), TripcastError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), TripcastError>;

    /// Stores an upload batch and its roster as `Pending` rows, atomically.
    async fn insert_upload(
        &self,
        batch: &UploadBatch,
        travelers: &[NewTraveler],
    ) -> Result<Vec<TravelerMessage>, TripcastError>;

    async fn get_upload(&self, upload_id: &str) -> Result<Option<UploadBatch>, TripcastError>;

    async fn get_traveler(&self, id: &str) -> Result<Option<TravelerMessage>, TripcastError>;

    /// All rows of an upload in upload order.
    async fn list_travelers(&self, upload_id: &str)
        -> Result<Vec<TravelerMessage>, TripcastError>;

    /// Rows that still need delivery: `Pending`, plus `Failed` rows whose
    /// retry count is below `retry_ceiling`. Upload order.
    async fn list_dispatchable(
        &self,
        upload_id: &str,
        retry_ceiling: u32,
    ) -> Result<Vec<TravelerMessage>, TripcastError>;

    /// `Failed` rows below `retry_ceiling`, at most `limit`, upload order.
    /// Rows with `rejected_locally` set are excluded.
    async fn list_retryable(
        &self,
        upload_id: &str,
        retry_ceiling: u32,
        limit: usize,
    ) -> Result<Vec<TravelerMessage>, TripcastError>;

    /// Number of `Failed` gateway attempts that reached `retry_ceiling`.
    async fn count_at_ceiling(
        &self,
        upload_id: &str,
        retry_ceiling: u32,
    ) -> Result<u64, TripcastError>;

    /// Upload ids with at least one retryable row, oldest upload first.
    async fn list_uploads_with_retryable(
        &self,
        retry_ceiling: u32,
    ) -> Result<Vec<String>, TripcastError>;

    /// Rows whose last attempt falls in `[from, until)` (RFC 3339 UTC bounds).
    async fn list_attempted_between(
        &self,
        from: &str,
        until: &str,
    ) -> Result<Vec<TravelerMessage>, TripcastError>;

    /// Uploads dated `upload_date` (`YYYY-MM-DD`).
    async fn list_uploads_on(&self, upload_date: &str)
        -> Result<Vec<UploadBatch>, TripcastError>;

    /// Claims a record for one send attempt.
    ///
    /// Succeeds only if the stored status and retry count still equal the
    /// expected values and no unexpired claim exists. Returns `None` when
    /// another dispatch got there first.
    async fn claim(
        &self,
        id: &str,
        expected_status: DeliveryStatus,
        expected_retry_count: u32,
        lease: Duration,
    ) -> Result<Option<ClaimToken>, TripcastError>;

    /// Applies the attempt result and drops the claim. Returns `false` when
    /// the claim was lost (lease expired and another dispatch took over).
    async fn complete(
        &self,
        id: &str,
        token: &ClaimToken,
        update: &DeliveryUpdate,
        attempted_at: &str,
    ) -> Result<bool, TripcastError>;

    /// Drops a claim without touching the record.
    async fn release(&self, id: &str, token: &ClaimToken) -> Result<(), TripcastError>;

    /// Replaces the phone of an unsent, unclaimed record and clears
    /// `rejected_locally`. Returns `false` when nothing was updated.
    async fn correct_phone(&self, id: &str, phone: &str) -> Result<bool, TripcastError>;

    /// Moves `TemplateRequired` rows of an upload back to `Pending`.
    async fn requeue_template_required(&self, upload_id: &str) -> Result<u64, TripcastError>;
}
