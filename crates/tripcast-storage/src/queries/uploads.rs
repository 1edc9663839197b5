// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upload batch ingestion and lookup.

use rusqlite::{OptionalExtension, params};
use tripcast_core::{
    DeliveryStatus, NewTraveler, TravelerMessage, TripcastError, UploadBatch, now_timestamp,
};

use crate::database::Database;

fn row_to_upload(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadBatch> {
    Ok(UploadBatch {
        upload_id: row.get(0)?,
        agency_id: row.get(1)?,
        bus_id: row.get(2)?,
        file_name: row.get(3)?,
        upload_date: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Checks the ingestion payload before anything is written.
fn validate_upload(batch: &UploadBatch, travelers: &[NewTraveler]) -> Result<(), TripcastError> {
    for (field, value) in [
        ("upload_id", &batch.upload_id),
        ("agency_id", &batch.agency_id),
        ("bus_id", &batch.bus_id),
        ("upload_date", &batch.upload_date),
    ] {
        if value.trim().is_empty() {
            return Err(TripcastError::Validation(format!(
                "upload {field} must not be empty"
            )));
        }
    }
    if chrono::NaiveDate::parse_from_str(&batch.upload_date, "%Y-%m-%d").is_err() {
        return Err(TripcastError::Validation(format!(
            "upload_date `{}` is not YYYY-MM-DD",
            batch.upload_date
        )));
    }
    for (i, t) in travelers.iter().enumerate() {
        if t.traveler_name.trim().is_empty() || t.coupon_code.trim().is_empty() {
            return Err(TripcastError::Validation(format!(
                "traveler #{i} needs a name and a coupon code"
            )));
        }
    }
    Ok(())
}

/// Insert an upload batch and its roster in one transaction.
///
/// Every traveler starts `Pending` with `retry_count = 0`; `position` is the
/// roster index. A duplicate `upload_id` is rejected without writing anything.
pub async fn insert_upload(
    db: &Database,
    batch: &UploadBatch,
    travelers: &[NewTraveler],
) -> Result<Vec<TravelerMessage>, TripcastError> {
    validate_upload(batch, travelers)?;

    let created_at = if batch.created_at.is_empty() {
        now_timestamp()
    } else {
        batch.created_at.clone()
    };
    let batch = UploadBatch {
        created_at: created_at.clone(),
        ..batch.clone()
    };
    let records: Vec<TravelerMessage> = travelers
        .iter()
        .enumerate()
        .map(|(i, t)| TravelerMessage {
            id: uuid::Uuid::new_v4().to_string(),
            agency_id: batch.agency_id.clone(),
            bus_id: batch.bus_id.clone(),
            upload_id: batch.upload_id.clone(),
            position: i as i64,
            traveler_name: t.traveler_name.clone(),
            phone: t.phone.clone(),
            coupon_code: t.coupon_code.clone(),
            travel_date: t.travel_date.clone(),
            delivery_status: DeliveryStatus::Pending,
            retry_count: 0,
            last_attempt_at: None,
            last_error: None,
            provider_message_id: None,
            rejected_locally: false,
            created_at: created_at.clone(),
        })
        .collect();

    let upload_id = batch.upload_id.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM uploads WHERE upload_id = ?1)",
                params![batch.upload_id],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO uploads (upload_id, agency_id, bus_id, file_name, upload_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    batch.upload_id,
                    batch.agency_id,
                    batch.bus_id,
                    batch.file_name,
                    batch.upload_date,
                    batch.created_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO travelers (id, upload_id, agency_id, bus_id, position,
                        traveler_name, phone, coupon_code, travel_date, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                )?;
                for r in &records {
                    stmt.execute(params![
                        r.id,
                        r.upload_id,
                        r.agency_id,
                        r.bus_id,
                        r.position,
                        r.traveler_name,
                        r.phone,
                        r.coupon_code,
                        r.travel_date,
                        r.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(Some(records))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    inserted.ok_or_else(|| {
        TripcastError::Validation(format!("upload `{upload_id}` already exists"))
    })
}

/// Get an upload batch by ID.
pub async fn get_upload(db: &Database, upload_id: &str) -> Result<Option<UploadBatch>, TripcastError> {
    let upload_id = upload_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT upload_id, agency_id, bus_id, file_name, upload_date, created_at
                 FROM uploads WHERE upload_id = ?1",
                params![upload_id],
                row_to_upload,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Uploads dated `upload_date`, oldest first.
pub async fn list_uploads_on(
    db: &Database,
    upload_date: &str,
) -> Result<Vec<UploadBatch>, TripcastError> {
    let upload_date = upload_date.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT upload_id, agency_id, bus_id, file_name, upload_date, created_at
                 FROM uploads WHERE upload_date = ?1 ORDER BY created_at ASC, upload_id ASC",
            )?;
            let rows = stmt.query_map(params![upload_date], row_to_upload)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
