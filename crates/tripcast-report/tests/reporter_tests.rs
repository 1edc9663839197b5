// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporter integration tests over a temp store.

use std::time::Duration;

use tripcast_config::model::QuotaScope;
use tripcast_core::{
    DeliveryUpdate, QuotaTracker, StorageAdapter, TravelerMessage, TripcastError, now_timestamp,
};
use tripcast_report::Reporter;
use tripcast_test_utils::TestHarness;

async fn finish(harness: &TestHarness, record: &TravelerMessage, update: DeliveryUpdate) {
    let token = harness
        .storage
        .claim(
            &record.id,
            record.delivery_status,
            record.retry_count,
            Duration::from_secs(60),
        )
        .await
        .unwrap()
        .unwrap();
    assert!(harness
        .storage
        .complete(&record.id, &token, &update, &now_timestamp())
        .await
        .unwrap());
}

fn reporter(harness: &TestHarness) -> Reporter {
    Reporter::from_config(&harness.config, harness.storage_adapter(), harness.quota.clone()).unwrap()
}

#[tokio::test]
async fn batch_status_reflects_store() {
    let harness = TestHarness::builder().build().await.unwrap();
    let rows = harness
        .seed_upload("u1", &["9900408811", "9900408812", "9900408813", "9900408814"])
        .await
        .unwrap();
    finish(
        &harness,
        &rows[0],
        DeliveryUpdate::Sent {
            provider_message_id: "S-1".into(),
        },
    )
    .await;
    finish(
        &harness,
        &rows[1],
        DeliveryUpdate::Failed {
            error: "E.busy".into(),
            gateway_attempt: true,
        },
    )
    .await;

    let summary = reporter(&harness).batch_status("u1").await.unwrap();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.sent_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.pending_count, 2);
    assert!((summary.progress_percentage - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn batch_status_unknown_upload_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    assert!(matches!(
        reporter(&harness).batch_status("missing").await,
        Err(TripcastError::NotFound { .. })
    ));
}

#[tokio::test]
async fn day_summary_and_retry_analytics_cover_today() {
    let harness = TestHarness::builder().build().await.unwrap();
    let rows = harness.seed_upload("u1", &["9900408811"]).await.unwrap();
    harness.seed_upload("u2", &["9900408812"]).await.unwrap();
    finish(
        &harness,
        &rows[0],
        DeliveryUpdate::Failed {
            error: "E.busy".into(),
            gateway_attempt: true,
        },
    )
    .await;

    let reporter = reporter(&harness);
    let today = harness.calendar.today();

    let day = reporter.day_summary(today).await.unwrap();
    assert_eq!(day.upload_count, 2);
    assert_eq!(day.totals.total, 2);
    assert_eq!(day.totals.failed, 1);

    let histogram = reporter.retry_analytics(today).await.unwrap();
    assert_eq!(histogram.one, 1);
    assert_eq!(histogram.still_failed, 1);
}

#[tokio::test]
async fn daily_usage_reads_quota() {
    let harness = TestHarness::builder()
        .with_daily_limit(4)
        .build()
        .await
        .unwrap();
    let today = harness.calendar.today();
    assert!(harness.quota.try_reserve("global", today, 1).await.unwrap());

    let usage = reporter(&harness).daily_usage(today, None).await.unwrap();
    assert_eq!(usage.sent_today, 1);
    assert_eq!(usage.estimated_limit, 4);
    assert_eq!(usage.remaining, 3);
    assert!((usage.percentage - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn agency_scoped_usage_requires_an_agency() {
    let harness = TestHarness::builder()
        .with_daily_limit(4)
        .with_config(|config| config.quota.scope = QuotaScope::Agency)
        .build()
        .await
        .unwrap();
    let today = harness.calendar.today();
    assert!(harness.quota.try_reserve("agency:agency-1", today, 2).await.unwrap());
    let reporter = reporter(&harness);

    assert!(matches!(
        reporter.daily_usage(today, None).await,
        Err(TripcastError::Validation(msg)) if msg.contains("agency is required")
    ));
    let usage = reporter.daily_usage(today, Some("agency-1")).await.unwrap();
    assert_eq!(usage.sent_today, 2);
    assert_eq!(usage.remaining, 2);
}
