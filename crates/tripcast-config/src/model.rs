// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tripcast dispatch engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tripcast configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TripcastConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Messaging gateway endpoint and response classification.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Fallback template settings for agencies without their own profile.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Per-agency template profiles.
    #[serde(default)]
    pub agencies: Vec<AgencyConfig>,

    /// Daily send quota.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Batch dispatcher behavior.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Retry ceiling and background sweep.
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP API surface.
    #[serde(default)]
    pub api: ApiConfig,

    /// Prometheus metrics export.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

impl TripcastConfig {
    /// Looks up the template profile for an agency.
    pub fn agency(&self, agency_id: &str) -> Option<&AgencyConfig> {
        self.agencies.iter().find(|a| a.id == agency_id)
    }
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs and the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "tripcast".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tripcast").join("tripcast.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tripcast.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Messaging gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Send endpoint. `None` means the gateway is not configured and
    /// dispatch commands refuse to start.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Gateway API key, sent as the `apikey` query parameter.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional endpoint reporting today's sent count for the account.
    #[serde(default)]
    pub usage_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Response prefix the gateway uses for an accepted message.
    #[serde(default = "default_success_prefix")]
    pub success_prefix: String,

    /// Case-insensitive substring marking a template-not-approved response.
    #[serde(default = "default_template_marker")]
    pub template_required_marker: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            usage_url: None,
            timeout_secs: default_timeout_secs(),
            success_prefix: default_success_prefix(),
            template_required_marker: default_template_marker(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_success_prefix() -> String {
    "S.".to_string()
}

fn default_template_marker() -> String {
    "template".to_string()
}

/// Fallback template settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Template used for agencies without an `[[agencies]]` entry.
    #[serde(default)]
    pub default_template: Option<String>,

    /// Booking website placed in the template's link parameter.
    #[serde(default)]
    pub default_website_url: Option<String>,

    /// Header image URL.
    #[serde(default)]
    pub default_image_url: Option<String>,
}

/// Template profile of one agency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgencyConfig {
    /// Agency identifier as carried on traveler records.
    pub id: String,

    /// Approved provider template name.
    pub template_name: String,

    /// Booking website URL.
    #[serde(default)]
    pub website_url: Option<String>,

    /// Header image URL.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Where the daily counter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaBackend {
    /// Row in the SQLite database; survives restarts.
    Sqlite,
    /// Process memory; single-process deployments and tests.
    Memory,
}

/// What one counter covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaScope {
    /// One counter for the whole gateway account.
    Global,
    /// One counter per agency.
    Agency,
}

/// Daily quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    #[serde(default = "default_quota_backend")]
    pub backend: QuotaBackend,

    #[serde(default = "default_quota_scope")]
    pub scope: QuotaScope,

    /// Estimated messages per day the gateway accepts.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,

    /// Offset from UTC, in minutes, of the calendar day the limit applies to.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            backend: default_quota_backend(),
            scope: default_quota_scope(),
            daily_limit: default_daily_limit(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

fn default_quota_backend() -> QuotaBackend {
    QuotaBackend::Sqlite
}

fn default_quota_scope() -> QuotaScope {
    QuotaScope::Global
}

fn default_daily_limit() -> u64 {
    1000
}

fn default_utc_offset_minutes() -> i32 {
    330 // IST
}

/// Batch dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Dialing code applied to national numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Seconds a claimed record stays locked before another dispatch may take it over.
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,

    /// Fold the provider's own daily usage figure into the quota before each batch.
    #[serde(default)]
    pub check_provider_usage: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
            claim_lease_secs: default_claim_lease_secs(),
            check_provider_usage: false,
        }
    }
}

fn default_country_code() -> String {
    "91".to_string()
}

fn default_claim_lease_secs() -> u64 {
    300
}

/// Retry coordinator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Failed attempts after which a record needs manual intervention.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Records retried per upload per pass.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Background sweep interval in seconds. 0 disables the sweep.
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            batch_limit: default_batch_limit(),
            sweep_interval_secs: 0,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_batch_limit() -> usize {
    100
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Host address to bind.
    #[serde(default = "default_api_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes. `None` rejects every `/v1` request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            bearer_token: None,
        }
    }
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    3000
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}
