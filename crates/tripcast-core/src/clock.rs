// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp formatting shared by the store and the dispatcher.
//!
//! Stored timestamps are UTC with millisecond precision, the same shape
//! SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` produces, so text
//! comparison orders them correctly.

use chrono::{DateTime, Utc};

/// `strftime` pattern of every stored timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formats `at` as a stored timestamp.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Current time as a stored timestamp.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}
