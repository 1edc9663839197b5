// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of records to quota counters.

use tripcast_config::model::QuotaScope;

/// Counter key used with [`QuotaScope::Global`].
pub const GLOBAL_KEY: &str = "global";

/// Quota key for a record of `agency_id` under `scope`.
pub fn quota_key(scope: QuotaScope, agency_id: &str) -> String {
    match scope {
        QuotaScope::Global => GLOBAL_KEY.to_string(),
        QuotaScope::Agency => format!("agency:{agency_id}"),
    }
}
