// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch dispatch integration tests over a real SQLite store and a
//! scripted gateway.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tripcast_core::{DeliveryStatus, StorageAdapter, TripcastError};
use tripcast_dispatch::{DispatchSummary, Dispatcher};
use tripcast_quota::MemoryQuota;
use tripcast_test_utils::{MockGateway, TestHarness};

const PHONES: [&str; 5] = [
    "9900408811",
    "9900408812",
    "9900408813",
    "9900408814",
    "9900408815",
];

fn dispatcher(harness: &TestHarness) -> Arc<Dispatcher> {
    Arc::new(
        Dispatcher::from_config(
            &harness.config,
            harness.storage_adapter(),
            harness.gateway_adapter(),
            harness.quota.clone(),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn quota_stop_leaves_tail_pending() {
    let harness = TestHarness::builder()
        .with_daily_limit(3)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &PHONES).await.unwrap();

    let summary = dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();

    assert_eq!(
        summary,
        DispatchSummary {
            upload_id: "u1".into(),
            sent_count: 3,
            failed_count: 0,
            template_required_count: 0,
            skipped_count: 0,
            remaining_to_process: 2,
            limit_reached: true,
        }
    );
    assert_eq!(
        harness.statuses("u1").await.unwrap(),
        vec![
            DeliveryStatus::Sent,
            DeliveryStatus::Sent,
            DeliveryStatus::Sent,
            DeliveryStatus::Pending,
            DeliveryStatus::Pending,
        ]
    );
    assert_eq!(harness.gateway.call_count().await, 3);
    assert_eq!(harness.quota_used_today().await.unwrap(), 3);
}

#[tokio::test]
async fn interrupted_batch_resumes_without_resending() {
    let harness = TestHarness::builder()
        .with_daily_limit(3)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &PHONES).await.unwrap();
    dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();

    // A fresh counter stands in for the next calendar day.
    let next_day = Dispatcher::from_config(
        &harness.config,
        harness.storage_adapter(),
        harness.gateway_adapter(),
        Arc::new(MemoryQuota::new(10)),
    )
    .unwrap();
    let summary = next_day.dispatch_batch("u1", None).await.unwrap();

    assert_eq!(summary.sent_count, 2);
    assert_eq!(summary.remaining_to_process, 0);
    assert!(!summary.limit_reached);

    let phones = harness.gateway.sent_phones().await;
    assert_eq!(phones.len(), 5);
    let unique: HashSet<_> = phones.iter().collect();
    assert_eq!(unique.len(), 5, "no traveler may be contacted twice");
}

#[tokio::test]
async fn sent_records_are_never_redispatched() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_upload("u1", &PHONES[..2]).await.unwrap();
    let dispatcher = dispatcher(&harness);

    dispatcher.dispatch_batch("u1", None).await.unwrap();
    let again = dispatcher.dispatch_batch("u1", None).await.unwrap();

    assert_eq!(again.sent_count, 0);
    assert_eq!(again.remaining_to_process, 0);
    assert_eq!(harness.gateway.call_count().await, 2);
}

#[tokio::test]
async fn invalid_phone_never_reaches_gateway() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .seed_upload("u1", &["123", "9900408817"])
        .await
        .unwrap();

    let summary = dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();

    assert_eq!(summary.sent_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(
        harness.gateway.sent_phones().await,
        vec!["+919900408817".to_string()]
    );
    assert_eq!(harness.quota_used_today().await.unwrap(), 1);

    let rows = harness.storage.list_travelers("u1").await.unwrap();
    assert_eq!(rows[0].delivery_status, DeliveryStatus::Failed);
    assert_eq!(rows[0].retry_count, 0);
    assert!(rows[0].last_error.as_deref().unwrap().starts_with("invalid phone"));
}

#[tokio::test]
async fn gateway_failure_records_error_and_counts_attempt() {
    let gateway = MockGateway::with_outcomes(vec![
        MockGateway::sent("S-1"),
        MockGateway::failed("E.invalid number"),
        MockGateway::template_required("template not approved"),
    ]);
    let harness = TestHarness::builder()
        .with_gateway(gateway)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &PHONES[..3]).await.unwrap();

    let summary = dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();
    assert_eq!(summary.sent_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.template_required_count, 1);

    let rows = harness.storage.list_travelers("u1").await.unwrap();
    assert_eq!(rows[0].provider_message_id.as_deref(), Some("S-1"));
    assert_eq!(rows[0].last_error, None);
    assert_eq!(rows[1].retry_count, 1);
    assert_eq!(rows[1].last_error.as_deref(), Some("E.invalid number"));
    assert!(rows[1].last_attempt_at.is_some());
    assert_eq!(rows[2].delivery_status, DeliveryStatus::TemplateRequired);
    assert_eq!(rows[2].retry_count, 0);
    assert!(rows[2].last_error.as_deref().unwrap().contains("trip_coupon"));
}

#[tokio::test]
async fn overlapping_dispatches_send_each_record_once() {
    let gateway = MockGateway::new().with_latency(Duration::from_millis(20));
    let harness = TestHarness::builder()
        .with_gateway(gateway)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &PHONES).await.unwrap();
    let dispatcher = dispatcher(&harness);

    let (a, b) = tokio::join!(
        dispatcher.dispatch_batch("u1", None),
        dispatcher.dispatch_batch("u1", None)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.sent_count + b.sent_count, 5);
    assert_eq!(harness.gateway.call_count().await, 5);
    let unique: HashSet<_> = harness.gateway.sent_phones().await.into_iter().collect();
    assert_eq!(unique.len(), 5);
    assert_eq!(harness.quota_used_today().await.unwrap(), 5);
}

#[tokio::test]
async fn message_override_replaces_free_text_slot() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_upload("u1", &PHONES[..1]).await.unwrap();

    dispatcher(&harness)
        .dispatch_batch("u1", Some("Show this coupon at boarding"))
        .await
        .unwrap();

    let sends = harness.gateway.sends().await;
    assert_eq!(sends[0].message.template_name, "trip_coupon");
    assert_eq!(sends[0].message.params[0], "Traveler 1");
    assert_eq!(sends[0].message.params[1], "CPN001");
    assert_eq!(sends[0].message.params[3], "Show this coupon at boarding");
}

#[tokio::test]
async fn website_fills_free_text_without_override() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_upload("u1", &PHONES[..1]).await.unwrap();

    dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();

    let sends = harness.gateway.sends().await;
    assert_eq!(sends[0].message.params[3], "https://agency-1.test");
}

#[tokio::test]
async fn unknown_agency_falls_back_to_default_template() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .seed_upload_for("u1", "agency-unknown", &PHONES[..1])
        .await
        .unwrap();

    dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();

    let sends = harness.gateway.sends().await;
    assert_eq!(sends[0].message.template_name, "fallback_coupon");
}

#[tokio::test]
async fn missing_template_aborts_before_any_send() {
    let harness = TestHarness::builder()
        .with_config(|c| c.whatsapp.default_template = None)
        .build()
        .await
        .unwrap();
    harness
        .seed_upload_for("u1", "agency-unknown", &PHONES[..2])
        .await
        .unwrap();

    let err = dispatcher(&harness)
        .dispatch_batch("u1", None)
        .await
        .unwrap_err();

    assert!(matches!(err, TripcastError::Config(_)));
    assert_eq!(harness.gateway.call_count().await, 0);
}

#[tokio::test]
async fn unknown_upload_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let err = dispatcher(&harness)
        .dispatch_batch("missing", None)
        .await
        .unwrap_err();
    assert!(matches!(err, TripcastError::NotFound { kind: "upload", .. }));
}

#[tokio::test]
async fn provider_usage_is_folded_into_quota() {
    let harness = TestHarness::builder()
        .with_daily_limit(10)
        .with_config(|c| c.dispatch.check_provider_usage = true)
        .build()
        .await
        .unwrap();
    harness.gateway.set_usage(Some(9)).await;
    harness.seed_upload("u1", &PHONES[..3]).await.unwrap();

    let summary = dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();

    assert_eq!(summary.sent_count, 1);
    assert!(summary.limit_reached);
    assert_eq!(summary.remaining_to_process, 2);
}

#[tokio::test]
async fn single_dispatch_reports_outcome() {
    let gateway = MockGateway::with_outcomes(vec![MockGateway::failed("E.busy")]);
    let harness = TestHarness::builder()
        .with_gateway(gateway)
        .build()
        .await
        .unwrap();
    let rows = harness.seed_upload("u1", &PHONES[..1]).await.unwrap();
    let dispatcher = dispatcher(&harness);

    let first = dispatcher.dispatch_single(&rows[0].id).await.unwrap();
    assert!(!first.success);
    assert!(first.message.contains("E.busy"));

    let second = dispatcher.dispatch_single(&rows[0].id).await.unwrap();
    assert!(second.success);

    let third = dispatcher.dispatch_single(&rows[0].id).await.unwrap();
    assert!(third.success);
    assert_eq!(third.message, "already sent");
    assert_eq!(harness.gateway.call_count().await, 2);
}

#[tokio::test]
async fn single_dispatch_unknown_record_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let err = dispatcher(&harness)
        .dispatch_single("nope")
        .await
        .unwrap_err();
    assert!(matches!(err, TripcastError::NotFound { kind: "traveler", .. }));
}

#[tokio::test]
async fn sqlite_quota_survives_across_dispatchers() {
    let harness = TestHarness::builder()
        .with_sqlite_quota()
        .with_daily_limit(2)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &PHONES[..1]).await.unwrap();
    harness.seed_upload("u2", &PHONES[1..3]).await.unwrap();

    dispatcher(&harness).dispatch_batch("u1", None).await.unwrap();
    let summary = dispatcher(&harness).dispatch_batch("u2", None).await.unwrap();

    assert_eq!(summary.sent_count, 1);
    assert!(summary.limit_reached);
    assert_eq!(harness.quota_used_today().await.unwrap(), 2);
}
