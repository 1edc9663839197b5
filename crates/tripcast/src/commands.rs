// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands.
//!
//! Each command opens the store, does one thing, prints the result and
//! closes the store again. They share the pipeline `serve` exposes over HTTP.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use tripcast_config::TripcastConfig;
use tripcast_core::{NewTraveler, StorageAdapter, TripcastError, UploadBatch};
use tripcast_quota::parse_date;

use crate::app::App;
use crate::output::{IngestReport, OutputMode, PhoneCorrection, RequeueReport, emit};

/// File accepted by `tripcast ingest`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestDocument {
    pub upload: UploadBatch,
    pub travelers: Vec<NewTraveler>,
}

impl IngestDocument {
    pub fn parse(content: &str) -> Result<Self, TripcastError> {
        serde_json::from_str(content)
            .map_err(|e| TripcastError::Validation(format!("invalid upload document: {e}")))
    }
}

/// Runs `body` against an opened app and closes the store afterwards,
/// whatever the outcome.
async fn with_app<F, Fut>(config: TripcastConfig, body: F) -> Result<(), TripcastError>
where
    F: FnOnce(App) -> Fut,
    Fut: std::future::Future<Output = Result<(), TripcastError>>,
{
    let app = App::open(config).await?;
    let result = body(app.clone()).await;
    if let Err(e) = app.close().await {
        warn!(error = %e, "failed to close storage cleanly");
    }
    result
}

pub async fn run_ingest(
    config: TripcastConfig,
    file: &Path,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    let content = std::fs::read_to_string(file).map_err(|e| {
        TripcastError::Validation(format!("cannot read {}: {e}", file.display()))
    })?;
    let document = IngestDocument::parse(&content)?;

    with_app(config, |app| async move {
        let stored = app
            .storage
            .insert_upload(&document.upload, &document.travelers)
            .await?;
        info!(
            upload_id = document.upload.upload_id.as_str(),
            count = stored.len(),
            "upload ingested"
        );
        emit(
            &IngestReport {
                upload_id: document.upload.upload_id.clone(),
                stored: stored.len(),
            },
            mode,
        )
    })
    .await
}

pub async fn run_dispatch(
    config: TripcastConfig,
    upload_id: &str,
    message_override: Option<&str>,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let summary = app
            .dispatcher()?
            .dispatch_batch(upload_id, message_override)
            .await?;
        emit(&summary, mode)
    })
    .await
}

pub async fn run_send(
    config: TripcastConfig,
    traveler_id: &str,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let result = app.dispatcher()?.dispatch_single(traveler_id).await?;
        emit(&result, mode)
    })
    .await
}

pub async fn run_retry(
    config: TripcastConfig,
    upload_id: &str,
    max_attempts: Option<u32>,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let summary = app
            .retry_coordinator()?
            .retry_failed(upload_id, max_attempts)
            .await?;
        emit(&summary, mode)
    })
    .await
}

pub async fn run_correct_phone(
    config: TripcastConfig,
    traveler_id: &str,
    phone: &str,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        app.dispatcher()?.correct_phone(traveler_id, phone).await?;
        emit(
            &PhoneCorrection {
                traveler_id: traveler_id.to_string(),
            },
            mode,
        )
    })
    .await
}

pub async fn run_requeue_templates(
    config: TripcastConfig,
    upload_id: &str,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let requeued = app
            .retry_coordinator()?
            .requeue_template_required(upload_id)
            .await?;
        emit(
            &RequeueReport {
                upload_id: upload_id.to_string(),
                requeued,
            },
            mode,
        )
    })
    .await
}

/// Batch status by upload id, or the day summary for `date` (today by default).
pub async fn run_status(
    config: TripcastConfig,
    upload_id: Option<&str>,
    date: Option<&str>,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let reporter = app.reporter()?;
        match upload_id {
            Some(upload_id) => emit(&reporter.batch_status(upload_id).await?, mode),
            None => {
                let date = match date {
                    Some(raw) => parse_date(raw)?,
                    None => reporter.calendar().today(),
                };
                emit(&reporter.day_summary(date).await?, mode)
            }
        }
    })
    .await
}

pub async fn run_usage(
    config: TripcastConfig,
    date: Option<&str>,
    agency: Option<&str>,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let reporter = app.reporter()?;
        let date = match date {
            Some(raw) => parse_date(raw)?,
            None => reporter.calendar().today(),
        };
        emit(&reporter.daily_usage(date, agency).await?, mode)
    })
    .await
}

pub async fn run_analytics(
    config: TripcastConfig,
    date: Option<&str>,
    mode: OutputMode,
) -> Result<(), TripcastError> {
    with_app(config, |app| async move {
        let reporter = app.reporter()?;
        let date = match date {
            Some(raw) => parse_date(raw)?,
            None => reporter.calendar().today(),
        };
        emit(&reporter.retry_analytics(date).await?, mode)
    })
    .await
}
