// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traveler record queries and the claim/complete state transitions.
//!
//! A send attempt owns a record only between [`claim`] and [`complete`] (or
//! [`release`]). The claim is a compare-and-set on status, retry count and an
//! expired lock, the same `locked_until` lease a crash-safe queue uses, so a
//! dispatcher that dies mid-send frees the record once the lease runs out.

use std::str::FromStr;
use std::time::Duration;

use rusqlite::{OptionalExtension, params};
use tripcast_core::{ClaimToken, DeliveryStatus, DeliveryUpdate, TravelerMessage, TripcastError};

use crate::database::Database;

const TRAVELER_COLUMNS: &str = "id, agency_id, bus_id, upload_id, position, traveler_name, phone,
     coupon_code, travel_date, delivery_status, retry_count, last_attempt_at, last_error,
     provider_message_id, rejected_locally, created_at";

fn row_to_traveler(row: &rusqlite::Row<'_>) -> rusqlite::Result<TravelerMessage> {
    let status: String = row.get(9)?;
    let delivery_status = DeliveryStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(TravelerMessage {
        id: row.get(0)?,
        agency_id: row.get(1)?,
        bus_id: row.get(2)?,
        upload_id: row.get(3)?,
        position: row.get(4)?,
        traveler_name: row.get(5)?,
        phone: row.get(6)?,
        coupon_code: row.get(7)?,
        travel_date: row.get(8)?,
        delivery_status,
        retry_count: row.get(10)?,
        last_attempt_at: row.get(11)?,
        last_error: row.get(12)?,
        provider_message_id: row.get(13)?,
        rejected_locally: row.get(14)?,
        created_at: row.get(15)?,
    })
}

/// Runs a traveler SELECT with the given WHERE/ORDER tail and parameters.
async fn select_travelers(
    db: &Database,
    tail: &'static str,
    params: Vec<rusqlite::types::Value>,
) -> Result<Vec<TravelerMessage>, TripcastError> {
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {TRAVELER_COLUMNS} FROM travelers {tail}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(params), row_to_traveler)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn text(s: &str) -> rusqlite::types::Value {
    rusqlite::types::Value::Text(s.to_string())
}

fn int(n: i64) -> rusqlite::types::Value {
    rusqlite::types::Value::Integer(n)
}

/// Get a traveler record by ID.
pub async fn get_traveler(db: &Database, id: &str) -> Result<Option<TravelerMessage>, TripcastError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {TRAVELER_COLUMNS} FROM travelers WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_traveler).optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All rows of an upload in upload order.
pub async fn list_travelers(
    db: &Database,
    upload_id: &str,
) -> Result<Vec<TravelerMessage>, TripcastError> {
    select_travelers(
        db,
        "WHERE upload_id = ?1 ORDER BY position ASC",
        vec![text(upload_id)],
    )
    .await
}

/// `Pending` rows plus `Failed` rows below the retry ceiling, upload order.
///
/// Locally rejected rows are included so an explicit dispatch validates
/// their phone again.
pub async fn list_dispatchable(
    db: &Database,
    upload_id: &str,
    retry_ceiling: u32,
) -> Result<Vec<TravelerMessage>, TripcastError> {
    select_travelers(
        db,
        "WHERE upload_id = ?1
           AND (delivery_status = 'pending'
                OR (delivery_status = 'failed' AND retry_count < ?2))
         ORDER BY position ASC",
        vec![text(upload_id), int(i64::from(retry_ceiling))],
    )
    .await
}

/// `Failed` gateway attempts below the retry ceiling, at most `limit`,
/// upload order. Locally rejected rows are skipped.
pub async fn list_retryable(
    db: &Database,
    upload_id: &str,
    retry_ceiling: u32,
    limit: usize,
) -> Result<Vec<TravelerMessage>, TripcastError> {
    select_travelers(
        db,
        "WHERE upload_id = ?1 AND delivery_status = 'failed' AND retry_count < ?2
           AND rejected_locally = 0
         ORDER BY position ASC LIMIT ?3",
        vec![
            text(upload_id),
            int(i64::from(retry_ceiling)),
            int(i64::try_from(limit).unwrap_or(i64::MAX)),
        ],
    )
    .await
}

/// Rows whose last attempt falls in `[from, until)`.
pub async fn list_attempted_between(
    db: &Database,
    from: &str,
    until: &str,
) -> Result<Vec<TravelerMessage>, TripcastError> {
    select_travelers(
        db,
        "WHERE last_attempt_at >= ?1 AND last_attempt_at < ?2
         ORDER BY last_attempt_at ASC",
        vec![text(from), text(until)],
    )
    .await
}

/// Number of `Failed` gateway attempts of an upload at or above the retry
/// ceiling.
pub async fn count_at_ceiling(
    db: &Database,
    upload_id: &str,
    retry_ceiling: u32,
) -> Result<u64, TripcastError> {
    let upload_id = upload_id.to_string();
    let count: i64 = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM travelers
                 WHERE upload_id = ?1 AND delivery_status = 'failed' AND retry_count >= ?2
                   AND rejected_locally = 0",
                params![upload_id, retry_ceiling],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(count.max(0) as u64)
}

/// Upload ids that still hold rows [`list_retryable`] would return, oldest
/// upload first.
pub async fn list_uploads_with_retryable(
    db: &Database,
    retry_ceiling: u32,
) -> Result<Vec<String>, TripcastError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT u.upload_id FROM uploads u
                 JOIN travelers t ON t.upload_id = u.upload_id
                 WHERE t.delivery_status = 'failed' AND t.retry_count < ?1
                   AND t.rejected_locally = 0
                 GROUP BY u.upload_id
                 ORDER BY MIN(u.created_at) ASC, u.upload_id ASC",
            )?;
            let rows = stmt.query_map(params![retry_ceiling], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim a record for one send attempt.
///
/// Returns `None` if the row changed since it was read (status or retry
/// count differ) or another dispatch holds an unexpired claim.
pub async fn claim(
    db: &Database,
    id: &str,
    expected_status: DeliveryStatus,
    expected_retry_count: u32,
    lease: Duration,
) -> Result<Option<ClaimToken>, TripcastError> {
    let id = id.to_string();
    let token = uuid::Uuid::new_v4().to_string();
    let lease_modifier = format!("+{} seconds", lease.as_secs().max(1));
    let status = expected_status.to_string();
    let claimed_token = token.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE travelers SET claim_token = ?1,
                 locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3 AND delivery_status = ?4 AND retry_count = ?5
                   AND (locked_until IS NULL
                        OR locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![claimed_token, lease_modifier, id, status, expected_retry_count],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok((changed == 1).then_some(ClaimToken(token)))
}

/// Apply the attempt result and drop the claim.
///
/// Lands only while `token` still owns the row. A gateway `Failed` bumps
/// `retry_count`; a local `Failed` sets `rejected_locally` instead. Any
/// other update clears that flag.
pub async fn complete(
    db: &Database,
    id: &str,
    token: &ClaimToken,
    update: &DeliveryUpdate,
    attempted_at: &str,
) -> Result<bool, TripcastError> {
    let (increment, last_error, provider_message_id) = match update {
        DeliveryUpdate::Sent {
            provider_message_id,
        } => (0u32, None, Some(provider_message_id.clone())),
        DeliveryUpdate::Failed {
            error,
            gateway_attempt,
        } => (u32::from(*gateway_attempt), Some(error.clone()), None),
        DeliveryUpdate::TemplateRequired { error } => (0, Some(error.clone()), None),
    };
    let rejected_locally = matches!(
        update,
        DeliveryUpdate::Failed {
            gateway_attempt: false,
            ..
        }
    );
    let status = update.status().to_string();
    let id = id.to_string();
    let token = token.0.clone();
    let attempted_at = attempted_at.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE travelers SET delivery_status = ?1,
                 retry_count = retry_count + ?2,
                 last_error = ?3,
                 provider_message_id = COALESCE(?4, provider_message_id),
                 last_attempt_at = ?5,
                 rejected_locally = ?6,
                 claim_token = NULL,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?7 AND claim_token = ?8",
                params![
                    status,
                    increment,
                    last_error,
                    provider_message_id,
                    attempted_at,
                    rejected_locally,
                    id,
                    token
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

/// Drop a claim without touching the record.
pub async fn release(db: &Database, id: &str, token: &ClaimToken) -> Result<(), TripcastError> {
    let id = id.to_string();
    let token = token.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE travelers SET claim_token = NULL, locked_until = NULL
                 WHERE id = ?1 AND claim_token = ?2",
                params![id, token],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the phone of an unsent, unclaimed record and clear its local
/// rejection so retries pick it up again.
///
/// Returns `false` when the record is missing, already sent or claimed.
pub async fn correct_phone(db: &Database, id: &str, phone: &str) -> Result<bool, TripcastError> {
    let id = id.to_string();
    let phone = phone.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE travelers SET phone = ?1, rejected_locally = 0,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND delivery_status <> 'sent'
                   AND (locked_until IS NULL
                        OR locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![phone, id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

/// Move unclaimed `TemplateRequired` rows of an upload back to `Pending`.
pub async fn requeue_template_required(db: &Database, upload_id: &str) -> Result<u64, TripcastError> {
    let upload_id = upload_id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE travelers SET delivery_status = 'pending',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE upload_id = ?1 AND delivery_status = 'template_required'
                   AND (locked_until IS NULL
                        OR locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![upload_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::uploads::insert_upload;
    use tempfile::tempdir;
    use tripcast_core::{NewTraveler, UploadBatch};

    const LEASE: Duration = Duration::from_secs(300);
    const AT: &str = "2026-03-01T10:00:00.000Z";

    async fn setup(n: usize) -> (Database, Vec<TravelerMessage>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let batch = UploadBatch {
            upload_id: "u1".to_string(),
            agency_id: "agency-1".to_string(),
            bus_id: "bus-1".to_string(),
            file_name: "roster.csv".to_string(),
            upload_date: "2026-03-01".to_string(),
            created_at: String::new(),
        };
        let travelers: Vec<NewTraveler> = (0..n)
            .map(|i| NewTraveler {
                traveler_name: format!("traveler-{i}"),
                phone: format!("99004088{i:02}"),
                coupon_code: format!("CPN{i}"),
                travel_date: "2026-03-05".to_string(),
            })
            .collect();
        let rows = insert_upload(&db, &batch, &travelers).await.unwrap();
        (db, rows, dir)
    }

    fn failed() -> DeliveryUpdate {
        DeliveryUpdate::Failed {
            error: "E.gateway error".to_string(),
            gateway_attempt: true,
        }
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_completed() {
        let (db, rows, _dir) = setup(1).await;
        let id = &rows[0].id;

        let token = claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap();
        assert!(token.is_some());
        let second = claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap();
        assert!(second.is_none(), "held claim must not be granted twice");
    }

    #[tokio::test]
    async fn claim_fails_on_stale_expectation() {
        let (db, rows, _dir) = setup(1).await;
        let id = &rows[0].id;
        assert!(claim(&db, id, DeliveryStatus::Failed, 0, LEASE).await.unwrap().is_none());
        assert!(claim(&db, id, DeliveryStatus::Pending, 1, LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_sent_clears_error_and_keeps_retry_count() {
        let (db, rows, _dir) = setup(1).await;
        let id = &rows[0].id;

        let token = claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        assert!(complete(&db, id, &token, &failed(), AT).await.unwrap());

        let token = claim(&db, id, DeliveryStatus::Failed, 1, LEASE).await.unwrap().unwrap();
        let sent = DeliveryUpdate::Sent {
            provider_message_id: "S.abc".to_string(),
        };
        assert!(complete(&db, id, &token, &sent, AT).await.unwrap());

        let row = get_traveler(&db, id).await.unwrap().unwrap();
        assert_eq!(row.delivery_status, DeliveryStatus::Sent);
        assert_eq!(row.retry_count, 1);
        assert!(row.last_error.is_none());
        assert_eq!(row.provider_message_id.as_deref(), Some("S.abc"));
        assert_eq!(row.last_attempt_at.as_deref(), Some(AT));
    }

    #[tokio::test]
    async fn local_failure_does_not_count_as_attempt() {
        let (db, rows, _dir) = setup(1).await;
        let id = &rows[0].id;
        let token = claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        let update = DeliveryUpdate::Failed {
            error: "invalid phone".to_string(),
            gateway_attempt: false,
        };
        complete(&db, id, &token, &update, AT).await.unwrap();

        let row = get_traveler(&db, id).await.unwrap().unwrap();
        assert_eq!(row.delivery_status, DeliveryStatus::Failed);
        assert_eq!(row.retry_count, 0);
        assert!(row.rejected_locally);
    }

    #[tokio::test]
    async fn locally_rejected_rows_stay_out_of_retry_set() {
        let (db, rows, _dir) = setup(2).await;
        let rejected = DeliveryUpdate::Failed {
            error: "invalid phone".to_string(),
            gateway_attempt: false,
        };
        let t0 = claim(&db, &rows[0].id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        complete(&db, &rows[0].id, &t0, &rejected, AT).await.unwrap();
        let t1 = claim(&db, &rows[1].id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        complete(&db, &rows[1].id, &t1, &failed(), AT).await.unwrap();

        let retryable = list_retryable(&db, "u1", 3, 1).await.unwrap();
        assert_eq!(retryable.len(), 1);
        assert_eq!(retryable[0].id, rows[1].id);
        assert_eq!(count_at_ceiling(&db, "u1", 0).await.unwrap(), 1);
        assert_eq!(list_dispatchable(&db, "u1", 3).await.unwrap().len(), 2);

        // Only the rejected row is left once the gateway failure is sent.
        let t1 = claim(&db, &rows[1].id, DeliveryStatus::Failed, 1, LEASE).await.unwrap().unwrap();
        let sent = DeliveryUpdate::Sent {
            provider_message_id: "S.1".to_string(),
        };
        complete(&db, &rows[1].id, &t1, &sent, AT).await.unwrap();
        assert!(list_uploads_with_retryable(&db, 3).await.unwrap().is_empty());

        assert!(correct_phone(&db, &rows[0].id, "9900408890").await.unwrap());
        let row = get_traveler(&db, &rows[0].id).await.unwrap().unwrap();
        assert_eq!(row.phone, "9900408890");
        assert!(!row.rejected_locally);
        assert_eq!(list_uploads_with_retryable(&db, 3).await.unwrap(), vec!["u1"]);
        assert!(!correct_phone(&db, &rows[1].id, "9900408891").await.unwrap());
    }

    #[tokio::test]
    async fn complete_with_foreign_token_is_rejected() {
        let (db, rows, _dir) = setup(1).await;
        let id = &rows[0].id;
        claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();

        let stranger = ClaimToken("not-mine".to_string());
        assert!(!complete(&db, id, &stranger, &failed(), AT).await.unwrap());
        let row = get_traveler(&db, id).await.unwrap().unwrap();
        assert_eq!(row.delivery_status, DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn release_makes_record_claimable_again() {
        let (db, rows, _dir) = setup(1).await;
        let id = &rows[0].id;
        let token = claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        release(&db, id, &token).await.unwrap();
        assert!(claim(&db, id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dispatchable_and_retryable_respect_ceiling() {
        let (db, rows, _dir) = setup(3).await;

        // #0 failed three times, #1 failed once, #2 still pending.
        for _ in 0..3 {
            let current = get_traveler(&db, &rows[0].id).await.unwrap().unwrap();
            let token = claim(&db, &rows[0].id, current.delivery_status, current.retry_count, LEASE)
                .await
                .unwrap()
                .unwrap();
            complete(&db, &rows[0].id, &token, &failed(), AT).await.unwrap();
        }
        let token = claim(&db, &rows[1].id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        complete(&db, &rows[1].id, &token, &failed(), AT).await.unwrap();

        let dispatchable = list_dispatchable(&db, "u1", 3).await.unwrap();
        let ids: Vec<&str> = dispatchable.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![rows[1].id.as_str(), rows[2].id.as_str()]);

        let retryable = list_retryable(&db, "u1", 3, 10).await.unwrap();
        assert_eq!(retryable.len(), 1);
        assert_eq!(retryable[0].id, rows[1].id);

        assert_eq!(count_at_ceiling(&db, "u1", 3).await.unwrap(), 1);
        assert_eq!(list_uploads_with_retryable(&db, 3).await.unwrap(), vec!["u1"]);
        assert!(list_uploads_with_retryable(&db, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn requeue_moves_template_required_back_to_pending() {
        let (db, rows, _dir) = setup(2).await;
        let token = claim(&db, &rows[0].id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        let update = DeliveryUpdate::TemplateRequired {
            error: "template not approved".to_string(),
        };
        complete(&db, &rows[0].id, &token, &update, AT).await.unwrap();

        assert_eq!(requeue_template_required(&db, "u1").await.unwrap(), 1);
        let row = get_traveler(&db, &rows[0].id).await.unwrap().unwrap();
        assert_eq!(row.delivery_status, DeliveryStatus::Pending);
        assert_eq!(row.retry_count, 0);
    }

    #[tokio::test]
    async fn attempted_between_uses_half_open_range() {
        let (db, rows, _dir) = setup(2).await;
        let t0 = claim(&db, &rows[0].id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        complete(&db, &rows[0].id, &t0, &failed(), "2026-03-01T00:00:00.000Z").await.unwrap();
        let t1 = claim(&db, &rows[1].id, DeliveryStatus::Pending, 0, LEASE).await.unwrap().unwrap();
        complete(&db, &rows[1].id, &t1, &failed(), "2026-03-02T00:00:00.000Z").await.unwrap();

        let day = list_attempted_between(&db, "2026-03-01T00:00:00.000Z", "2026-03-02T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].id, rows[0].id);
    }
}
