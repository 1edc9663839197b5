// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, non-empty paths, country code format and duplicate agencies.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::TripcastConfig;

/// Largest accepted UTC offset, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TripcastConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty".to_string()));
    }

    for (key, url) in [
        ("gateway.base_url", &config.gateway.base_url),
        ("gateway.usage_url", &config.gateway.usage_url),
    ] {
        if let Some(url) = url
            && !is_http_url(url)
        {
            errors.push(validation(format!(
                "{key} must be an http(s) URL, got `{url}`"
            )));
        }
    }

    if config.gateway.timeout_secs == 0 {
        errors.push(validation("gateway.timeout_secs must be at least 1".to_string()));
    }

    if config.gateway.success_prefix.is_empty() {
        errors.push(validation("gateway.success_prefix must not be empty".to_string()));
    }

    if config.gateway.template_required_marker.trim().is_empty() {
        errors.push(validation(
            "gateway.template_required_marker must not be empty".to_string(),
        ));
    }

    let cc = &config.dispatch.default_country_code;
    if cc.is_empty() || cc.len() > 3 || !cc.chars().all(|c| c.is_ascii_digit()) {
        errors.push(validation(format!(
            "dispatch.default_country_code must be 1-3 digits without `+`, got `{cc}`"
        )));
    }

    if config.dispatch.claim_lease_secs <= config.gateway.timeout_secs {
        errors.push(validation(format!(
            "dispatch.claim_lease_secs ({}) must exceed gateway.timeout_secs ({})",
            config.dispatch.claim_lease_secs, config.gateway.timeout_secs
        )));
    }

    if config.quota.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        errors.push(validation(format!(
            "quota.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}, got {}",
            config.quota.utc_offset_minutes
        )));
    }

    if config.quota.daily_limit == 0 {
        errors.push(validation("quota.daily_limit must be at least 1".to_string()));
    }

    if config.retry.max_retries == 0 {
        errors.push(validation("retry.max_retries must be at least 1".to_string()));
    }

    if config.retry.batch_limit == 0 {
        errors.push(validation("retry.batch_limit must be at least 1".to_string()));
    }

    if config.api.host.trim().is_empty() {
        errors.push(validation("api.host must not be empty".to_string()));
    }

    let mut seen_ids = HashSet::new();
    for (i, agency) in config.agencies.iter().enumerate() {
        if agency.id.trim().is_empty() {
            errors.push(validation(format!("agencies[{i}].id must not be empty")));
        } else if !seen_ids.insert(&agency.id) {
            errors.push(validation(format!(
                "duplicate agency id `{}` in [[agencies]] array",
                agency.id
            )));
        }
        if agency.template_name.trim().is_empty() {
            errors.push(validation(format!(
                "agencies[{i}].template_name must not be empty"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
