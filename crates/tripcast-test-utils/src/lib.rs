// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tripcast integration tests.
//!
//! Provides a scripted gateway and a test harness with a temp SQLite store,
//! so dispatch tests run fast and deterministically without a real gateway.
//!
//! # Components
//!
//! - [`MockGateway`] - Gateway adapter replaying scripted outcomes and recording every call
//! - [`TestHarness`] - Temp store, quota tracker and config wired for dispatch tests

pub mod harness;
pub mod mock_gateway;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::{MockGateway, RecordedSend};
