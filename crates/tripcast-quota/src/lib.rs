// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily send quota tracking for the Tripcast dispatch engine.
//!
//! Two [`QuotaTracker`] backends share the same contract: an atomic
//! check-and-increment against a configured daily ceiling, a warning at 80%
//! of the limit, and an implicit reset when the calendar day changes.

pub mod calendar;
pub mod memory;
pub mod scope;
pub mod sqlite;
pub mod threshold;
pub mod usage;

use std::sync::Arc;

use tripcast_config::model::{QuotaBackend, QuotaConfig};
use tripcast_core::{QuotaTracker, TripcastError};
use tripcast_storage::Database;

pub use calendar::{QuotaCalendar, parse_date};
pub use memory::MemoryQuota;
pub use scope::{GLOBAL_KEY, quota_key};
pub use sqlite::SqliteQuota;
pub use usage::UsageSnapshot;

/// Build the tracker selected by `quota.backend`.
///
/// The SQLite backend shares the store's database handle.
pub fn build_tracker(
    config: &QuotaConfig,
    db: Option<&Database>,
) -> Result<Arc<dyn QuotaTracker>, TripcastError> {
    match config.backend {
        QuotaBackend::Memory => Ok(Arc::new(MemoryQuota::new(config.daily_limit))),
        QuotaBackend::Sqlite => {
            let db = db.ok_or_else(|| {
                TripcastError::Config("quota backend `sqlite` needs an open database".to_string())
            })?;
            Ok(Arc::new(SqliteQuota::new(db.clone(), config.daily_limit)))
        }
    }
}
