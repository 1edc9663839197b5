// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tripcast_config::model::StorageConfig;
use tripcast_core::{
    AdapterType, ClaimToken, DeliveryStatus, DeliveryUpdate, HealthStatus, NewTraveler,
    PluginAdapter, StorageAdapter, TravelerMessage, TripcastError, UploadBatch,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    ///
    /// The persistent quota tracker shares this handle so both run on the
    /// same writer thread.
    pub fn database(&self) -> Result<&Database, TripcastError> {
        self.db.get().ok_or_else(|| TripcastError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TripcastError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TripcastError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), TripcastError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TripcastError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TripcastError> {
        self.database()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Uploads ---

    async fn insert_upload(
        &self,
        batch: &UploadBatch,
        travelers: &[NewTraveler],
    ) -> Result<Vec<TravelerMessage>, TripcastError> {
        queries::uploads::insert_upload(self.database()?, batch, travelers).await
    }

    async fn get_upload(&self, upload_id: &str) -> Result<Option<UploadBatch>, TripcastError> {
        queries::uploads::get_upload(self.database()?, upload_id).await
    }

    async fn list_uploads_on(&self, upload_date: &str) -> Result<Vec<UploadBatch>, TripcastError> {
        queries::uploads::list_uploads_on(self.database()?, upload_date).await
    }

    // --- Traveler reads ---

    async fn get_traveler(&self, id: &str) -> Result<Option<TravelerMessage>, TripcastError> {
        queries::travelers::get_traveler(self.database()?, id).await
    }

    async fn list_travelers(&self, upload_id: &str) -> Result<Vec<TravelerMessage>, TripcastError> {
        queries::travelers::list_travelers(self.database()?, upload_id).await
    }

    async fn list_dispatchable(
        &self,
        upload_id: &str,
        retry_ceiling: u32,
    ) -> Result<Vec<TravelerMessage>, TripcastError> {
        queries::travelers::list_dispatchable(self.database()?, upload_id, retry_ceiling).await
    }

    async fn list_retryable(
        &self,
        upload_id: &str,
        retry_ceiling: u32,
        limit: usize,
    ) -> Result<Vec<TravelerMessage>, TripcastError> {
        queries::travelers::list_retryable(self.database()?, upload_id, retry_ceiling, limit).await
    }

    async fn count_at_ceiling(&self, upload_id: &str, retry_ceiling: u32) -> Result<u64, TripcastError> {
        queries::travelers::count_at_ceiling(self.database()?, upload_id, retry_ceiling).await
    }

    async fn list_uploads_with_retryable(
        &self,
        retry_ceiling: u32,
    ) -> Result<Vec<String>, TripcastError> {
        queries::travelers::list_uploads_with_retryable(self.database()?, retry_ceiling).await
    }

    async fn list_attempted_between(
        &self,
        from: &str,
        until: &str,
    ) -> Result<Vec<TravelerMessage>, TripcastError> {
        queries::travelers::list_attempted_between(self.database()?, from, until).await
    }

    // --- State transitions ---

    async fn claim(
        &self,
        id: &str,
        expected_status: DeliveryStatus,
        expected_retry_count: u32,
        lease: Duration,
    ) -> Result<Option<ClaimToken>, TripcastError> {
        queries::travelers::claim(self.database()?, id, expected_status, expected_retry_count, lease)
            .await
    }

    async fn complete(
        &self,
        id: &str,
        token: &ClaimToken,
        update: &DeliveryUpdate,
        attempted_at: &str,
    ) -> Result<bool, TripcastError> {
        queries::travelers::complete(self.database()?, id, token, update, attempted_at).await
    }

    async fn release(&self, id: &str, token: &ClaimToken) -> Result<(), TripcastError> {
        queries::travelers::release(self.database()?, id, token).await
    }

    async fn correct_phone(&self, id: &str, phone: &str) -> Result<bool, TripcastError> {
        queries::travelers::correct_phone(self.database()?, id, phone).await
    }

    async fn requeue_template_required(&self, upload_id: &str) -> Result<u64, TripcastError> {
        queries::travelers::requeue_template_required(self.database()?, upload_id).await
    }
}
