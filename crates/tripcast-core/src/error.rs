// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tripcast dispatch engine.

use thiserror::Error;

/// The primary error type used across all Tripcast adapter traits and core operations.
///
/// Per-record delivery problems are *not* errors: they are recorded on the
/// traveler row and reported in dispatch counts. This type is reserved for
/// conditions that abort a whole operation.
#[derive(Debug, Error)]
pub enum TripcastError {
    /// Configuration errors (invalid TOML, missing agency template, bad gateway URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors that cannot be attributed to a single record.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced upload or traveler record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input rejected before reaching the store (malformed ingestion payload).
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TripcastError {
    /// Shorthand for a missing upload batch.
    pub fn upload_not_found(upload_id: &str) -> Self {
        Self::NotFound {
            kind: "upload",
            id: upload_id.to_string(),
        }
    }

    /// Shorthand for a missing traveler record.
    pub fn traveler_not_found(traveler_id: &str) -> Self {
        Self::NotFound {
            kind: "traveler",
            id: traveler_id.to_string(),
        }
    }
}
