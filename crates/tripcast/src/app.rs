// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by `serve` and the one-shot commands.

use std::sync::Arc;

use tripcast_config::TripcastConfig;
use tripcast_core::{QuotaTracker, StorageAdapter, TripcastError};
use tripcast_dispatch::{Dispatcher, RetryCoordinator};
use tripcast_quota::build_tracker;
use tripcast_report::Reporter;
use tripcast_storage::SqliteStorage;
use tripcast_whatsapp::WhatsAppGateway;

/// Open store and quota tracker for one process.
#[derive(Clone)]
pub struct App {
    pub config: TripcastConfig,
    pub storage: Arc<SqliteStorage>,
    pub quota: Arc<dyn QuotaTracker>,
}

impl App {
    /// Opens the database (running migrations) and builds the quota tracker.
    pub async fn open(config: TripcastConfig) -> Result<Self, TripcastError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let quota = build_tracker(&config.quota, Some(storage.database()?))?;
        Ok(Self {
            config,
            storage: Arc::new(storage),
            quota,
        })
    }

    pub fn storage_adapter(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Dispatcher over the configured gateway. Fails with a configuration
    /// error when the gateway endpoint or key is missing.
    pub fn dispatcher(&self) -> Result<Arc<Dispatcher>, TripcastError> {
        let gateway = Arc::new(WhatsAppGateway::new(&self.config.gateway)?);
        Ok(Arc::new(Dispatcher::from_config(
            &self.config,
            self.storage_adapter(),
            gateway,
            self.quota.clone(),
        )?))
    }

    pub fn retry_coordinator(&self) -> Result<Arc<RetryCoordinator>, TripcastError> {
        Ok(Arc::new(RetryCoordinator::new(self.dispatcher()?)))
    }

    pub fn reporter(&self) -> Result<Reporter, TripcastError> {
        Reporter::from_config(&self.config, self.storage_adapter(), self.quota.clone())
    }

    /// Checkpoints and closes the database.
    pub async fn close(self) -> Result<(), TripcastError> {
        self.storage.close().await
    }
}
