// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for dispatch integration testing.
//!
//! `TestHarness` assembles a temp SQLite store, a quota tracker, a
//! [`MockGateway`] and a config with a default template. Tests build the
//! dispatcher on top of it so every layer below the gateway is real.

use std::sync::Arc;

use tripcast_config::model::{AgencyConfig, QuotaBackend, StorageConfig, TripcastConfig};
use tripcast_core::types::{DeliveryStatus, NewTraveler, TravelerMessage, UploadBatch};
use tripcast_core::{GatewayAdapter, QuotaTracker, StorageAdapter, TripcastError};
use tripcast_quota::{QuotaCalendar, build_tracker};
use tripcast_storage::SqliteStorage;

use crate::mock_gateway::MockGateway;

/// Agency every seeded upload belongs to.
pub const TEST_AGENCY: &str = "agency-1";
/// Template configured for [`TEST_AGENCY`].
pub const TEST_TEMPLATE: &str = "trip_coupon";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    gateway: MockGateway,
    config: TripcastConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = TripcastConfig::default();
        config.gateway.base_url = Some("http://gateway.test/send".to_string());
        config.gateway.api_key = Some("test-key".to_string());
        config.whatsapp.default_template = Some("fallback_coupon".to_string());
        config.whatsapp.default_website_url = Some("https://trips.test".to_string());
        config.agencies.push(AgencyConfig {
            id: TEST_AGENCY.to_string(),
            template_name: TEST_TEMPLATE.to_string(),
            website_url: Some("https://agency-1.test".to_string()),
            image_url: None,
        });
        config.quota.backend = QuotaBackend::Memory;
        Self {
            gateway: MockGateway::new(),
            config,
        }
    }

    /// Use a pre-scripted gateway.
    pub fn with_gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// Set the daily send limit.
    pub fn with_daily_limit(mut self, limit: u64) -> Self {
        self.config.quota.daily_limit = limit;
        self
    }

    /// Set the retry ceiling.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    /// Keep the quota counter in the store instead of memory.
    pub fn with_sqlite_quota(mut self) -> Self {
        self.config.quota.backend = QuotaBackend::Sqlite;
        self
    }

    /// Arbitrary config tweaks.
    pub fn with_config(mut self, tweak: impl FnOnce(&mut TripcastConfig)) -> Self {
        tweak(&mut self.config);
        self
    }

    /// Build the test harness, creating the temp store and quota tracker.
    pub async fn build(mut self) -> Result<TestHarness, TripcastError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| TripcastError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(self.config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let quota = build_tracker(&self.config.quota, Some(storage.database()?))?;
        let calendar = QuotaCalendar::new(self.config.quota.utc_offset_minutes)?;

        Ok(TestHarness {
            gateway: Arc::new(self.gateway),
            storage,
            quota,
            calendar,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock gateway and temp storage.
pub struct TestHarness {
    /// The scripted gateway.
    pub gateway: Arc<MockGateway>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Quota tracker selected by the config.
    pub quota: Arc<dyn QuotaTracker>,
    /// Calendar matching `config.quota.utc_offset_minutes`.
    pub calendar: QuotaCalendar,
    /// Configuration the harness was built with.
    pub config: TripcastConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The store as a trait object.
    pub fn storage_adapter(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// The gateway as a trait object.
    pub fn gateway_adapter(&self) -> Arc<dyn GatewayAdapter> {
        self.gateway.clone()
    }

    /// Store an upload for [`TEST_AGENCY`] dated today, one traveler per phone.
    pub async fn seed_upload(
        &self,
        upload_id: &str,
        phones: &[&str],
    ) -> Result<Vec<TravelerMessage>, TripcastError> {
        self.seed_upload_for(upload_id, TEST_AGENCY, phones).await
    }

    /// Store an upload for `agency_id` dated today, one traveler per phone.
    pub async fn seed_upload_for(
        &self,
        upload_id: &str,
        agency_id: &str,
        phones: &[&str],
    ) -> Result<Vec<TravelerMessage>, TripcastError> {
        let today = self.calendar.today().to_string();
        let batch = UploadBatch {
            upload_id: upload_id.to_string(),
            agency_id: agency_id.to_string(),
            bus_id: "bus-7".to_string(),
            file_name: format!("{upload_id}.xlsx"),
            upload_date: today.clone(),
            created_at: String::new(),
        };
        let travelers: Vec<NewTraveler> = phones
            .iter()
            .enumerate()
            .map(|(i, phone)| NewTraveler {
                traveler_name: format!("Traveler {}", i + 1),
                phone: phone.to_string(),
                coupon_code: format!("CPN{:03}", i + 1),
                travel_date: today.clone(),
            })
            .collect();
        self.storage.insert_upload(&batch, &travelers).await
    }

    /// Delivery status of every record of an upload, in upload order.
    pub async fn statuses(&self, upload_id: &str) -> Result<Vec<DeliveryStatus>, TripcastError> {
        Ok(self
            .storage
            .list_travelers(upload_id)
            .await?
            .into_iter()
            .map(|r| r.delivery_status)
            .collect())
    }

    /// Today's counter for the global quota key.
    pub async fn quota_used_today(&self) -> Result<u64, TripcastError> {
        Ok(self
            .quota
            .usage(tripcast_quota::GLOBAL_KEY, self.calendar.today())
            .await?
            .sent_count)
    }
}
