// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Tripcast dispatch engine.
//!
//! `tripcast.toml` is looked up in the XDG hierarchy, overridden by
//! `TRIPCAST_*` environment variables, deserialized strictly and then
//! checked semantically. Every failure comes back as a list of miette
//! diagnostics ready for [`render_errors`].
//!
//! ```no_run
//! let config = match tripcast_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         tripcast_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("daily limit: {}", config.quota.daily_limit);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TripcastConfig;

/// Loads from the XDG hierarchy plus environment, then validates.
pub fn load_and_validate() -> Result<TripcastConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || read_sources(&lookup_paths()))
}

/// Loads an explicit file plus environment, then validates.
pub fn load_and_validate_path(path: &Path) -> Result<TripcastConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_sources(&[path.to_path_buf()])
    })
}

/// Loads an inline TOML document (no files, no environment), then validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<TripcastConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates an extracted config, or converts the extraction error using
/// the sources `sources` yields (read lazily, only on failure).
fn checked(
    extracted: Result<TripcastConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<TripcastConfig, Vec<ConfigError>> {
    match extracted {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Files [`loader::load_config`] reads, in merge order.
fn lookup_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/tripcast/tripcast.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tripcast/tripcast.toml"));
    }
    paths.push(
        std::env::current_dir()
            .map(|d| d.join("tripcast.toml"))
            .unwrap_or_else(|_| PathBuf::from("tripcast.toml")),
    );
    paths
}

/// `(display path, content)` of every readable file in `paths`.
///
/// Display paths match what figment records as the error source.
fn read_sources(paths: &[PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
