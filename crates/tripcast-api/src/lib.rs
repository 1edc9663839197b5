// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the Tripcast dispatch engine.
//!
//! Exposes batch dispatch, single sends, retries, status, usage and retry
//! analytics as JSON endpoints under `/v1` (bearer-token auth), plus
//! unauthenticated `/health` and `/metrics`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{ApiState, HealthState, ServerConfig, build_router, start_server};
