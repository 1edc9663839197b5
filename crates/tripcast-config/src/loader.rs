// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tripcast.toml` > `~/.config/tripcast/tripcast.toml` >
//! `/etc/tripcast/tripcast.toml` with environment variable overrides via `TRIPCAST_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TripcastConfig;

/// Top-level sections addressable through `TRIPCAST_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "gateway",
    "whatsapp",
    "quota",
    "dispatch",
    "retry",
    "api",
    "prometheus",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tripcast/tripcast.toml` (system-wide)
/// 3. `~/.config/tripcast/tripcast.toml` (user XDG config)
/// 4. `./tripcast.toml` (local directory)
/// 5. `TRIPCAST_*` environment variables
pub fn load_config() -> Result<TripcastConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TripcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TripcastConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TripcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TripcastConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TripcastConfig::default()))
        .merge(Toml::file("/etc/tripcast/tripcast.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tripcast/tripcast.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tripcast.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// `Env::split("_")` would turn `TRIPCAST_GATEWAY_API_KEY` into
/// `gateway.api.key`; only the leading section name is split off here.
fn env_provider() -> Env {
    Env::prefixed("TRIPCAST_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
