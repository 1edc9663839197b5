// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tripcast WhatsApp dispatch engine.
//!
//! This crate provides the trait definitions, error type, domain types and
//! phone normalization used throughout the Tripcast workspace. Storage,
//! gateway and quota backends implement traits defined here.

pub mod clock;
pub mod error;
pub mod phone;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{format_timestamp, now_timestamp};
pub use error::TripcastError;
pub use phone::{PhoneError, mask_phone, normalize_phone};
pub use types::{
    AdapterType, ClaimToken, DailyQuota, DeliveryStatus, DeliveryUpdate, GatewayOutcome,
    HealthStatus, NewTraveler, TemplateMessage, TravelerMessage, UploadBatch,
};

pub use traits::{GatewayAdapter, PluginAdapter, QuotaTracker, StorageAdapter};
