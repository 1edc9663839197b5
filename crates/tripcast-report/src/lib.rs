// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side aggregation for the Tripcast dispatch engine.
//!
//! The aggregates are pure functions over `&[TravelerMessage]` so they can
//! be tested without a store or HTTP. [`Reporter`] loads one snapshot from
//! the store per call and applies them.

pub mod histogram;
pub mod reporter;
pub mod summary;

pub use histogram::{RetryHistogram, retry_histogram};
pub use reporter::Reporter;
pub use summary::{BatchSummary, DaySummary, StatusCounts, summarize_batch, summarize_day};
