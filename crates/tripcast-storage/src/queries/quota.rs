// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily quota counter rows.
//!
//! The check and the increment are one conditional UPDATE on the single
//! writer thread, so concurrent reservers can never push `sent_count` past
//! the limit.

use rusqlite::{OptionalExtension, params};
use tripcast_core::TripcastError;

use crate::database::Database;

/// Stored counter for one key and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRow {
    pub sent_count: u64,
    pub estimated_limit: u64,
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Reserve `n` slots. Returns the new count, or `None` (nothing written to
/// the counter) if `sent_count + n` would exceed `limit`.
pub async fn try_reserve(
    db: &Database,
    key: &str,
    date: &str,
    n: u64,
    limit: u64,
) -> Result<Option<u64>, TripcastError> {
    let key = key.to_string();
    let date = date.to_string();
    let (n, limit) = (to_i64(n), to_i64(limit));
    let reserved: Option<i64> = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO daily_quota (quota_key, date, sent_count, estimated_limit)
                 VALUES (?1, ?2, 0, ?3)",
                params![key, date, limit],
            )?;
            let changed = tx.execute(
                "UPDATE daily_quota SET sent_count = sent_count + ?3,
                 estimated_limit = ?4,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE quota_key = ?1 AND date = ?2 AND sent_count + ?3 <= ?4",
                params![key, date, n, limit],
            )?;
            let count = if changed == 1 {
                Some(tx.query_row(
                    "SELECT sent_count FROM daily_quota WHERE quota_key = ?1 AND date = ?2",
                    params![key, date],
                    |row| row.get(0),
                )?)
            } else {
                None
            };
            tx.commit()?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(reserved.map(|c| c.max(0) as u64))
}

/// Read the counter, `None` if nothing was reserved that day.
pub async fn get(db: &Database, key: &str, date: &str) -> Result<Option<QuotaRow>, TripcastError> {
    let key = key.to_string();
    let date = date.to_string();
    let row: Option<(i64, i64)> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT sent_count, estimated_limit FROM daily_quota
                 WHERE quota_key = ?1 AND date = ?2",
                params![key, date],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(row.map(|(sent, limit)| QuotaRow {
        sent_count: sent.max(0) as u64,
        estimated_limit: limit.max(0) as u64,
    }))
}

/// Raise the counter to at least `count`. Returns the resulting count.
pub async fn raise_to(
    db: &Database,
    key: &str,
    date: &str,
    count: u64,
    limit: u64,
) -> Result<u64, TripcastError> {
    let key = key.to_string();
    let date = date.to_string();
    let (count, limit) = (to_i64(count), to_i64(limit));
    let stored: i64 = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO daily_quota (quota_key, date, sent_count, estimated_limit)
                 VALUES (?1, ?2, 0, ?3)",
                params![key, date, limit],
            )?;
            tx.execute(
                "UPDATE daily_quota SET sent_count = MAX(sent_count, ?3),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE quota_key = ?1 AND date = ?2",
                params![key, date, count],
            )?;
            let stored = tx.query_row(
                "SELECT sent_count FROM daily_quota WHERE quota_key = ?1 AND date = ?2",
                params![key, date],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(stored.max(0) as u64)
}
