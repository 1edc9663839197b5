// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Storage and gateway adapters extend the [`PluginAdapter`] base trait and
//! use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod gateway;
pub mod quota;
pub mod storage;

pub use adapter::PluginAdapter;
pub use gateway::GatewayAdapter;
pub use quota::QuotaTracker;
pub use storage::StorageAdapter;
