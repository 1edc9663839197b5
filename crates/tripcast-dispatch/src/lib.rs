// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch dispatch and retry for the Tripcast engine.
//!
//! [`Dispatcher`] sends the records of an upload through the gateway under
//! the daily quota, [`RetryCoordinator`] re-runs failed records below the
//! retry ceiling, and [`RetrySweep`] does that periodically in the
//! background.

pub mod dispatcher;
pub mod retry;
pub mod sweep;
pub mod template;

pub use dispatcher::{
    AttemptOutcome, DispatchSettings, DispatchSummary, Dispatcher, PassTally,
    SingleDispatchResult,
};
pub use retry::{RetryCoordinator, RetrySummary};
pub use sweep::{RetrySweep, SweepReport};
pub use template::{AgencyDirectory, TemplateProfile};
