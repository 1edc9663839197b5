// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use tripcast_api::{ApiState, AuthConfig, HealthState, build_router};
use tripcast_config::model::QuotaScope;
use tripcast_dispatch::{Dispatcher, RetryCoordinator};
use tripcast_report::Reporter;
use tripcast_test_utils::{MockGateway, TestHarness};

const TOKEN: &str = "test-token";

fn router(harness: &TestHarness, metrics: Option<&'static str>) -> Router {
    let dispatcher = Arc::new(
        Dispatcher::from_config(
            &harness.config,
            harness.storage_adapter(),
            harness.gateway_adapter(),
            harness.quota.clone(),
        )
        .unwrap(),
    );
    let reporter = Reporter::from_config(
        &harness.config,
        harness.storage_adapter(),
        harness.quota.clone(),
    )
    .unwrap();
    let prometheus_render = metrics
        .map(|text| Arc::new(move || text.to_string()) as Arc<dyn Fn() -> String + Send + Sync>);
    let state = ApiState {
        retry: Arc::new(RetryCoordinator::new(dispatcher.clone())),
        dispatcher,
        reporter: Arc::new(reporter),
        health: HealthState {
            start_time: std::time::Instant::now(),
            storage: harness.storage_adapter(),
            prometheus_render,
        },
    };
    build_router(
        state,
        AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
    )
}

fn authed(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn v1_routes_require_bearer_token() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = router(&harness, None);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/usage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/usage")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dispatch_then_status() {
    let harness = TestHarness::builder()
        .with_daily_limit(2)
        .build()
        .await
        .unwrap();
    harness
        .seed_upload("u1", &["9900408811", "9900408812", "9900408813"])
        .await
        .unwrap();
    let app = router(&harness, None);

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/v1/uploads/u1/dispatch",
            r#"{"message_override": "See you at 7am"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["sent_count"], 2);
    assert_eq!(body["failed_count"], 0);
    assert_eq!(body["remaining_to_process"], 1);
    assert_eq!(body["limit_reached"], true);

    let response = app
        .oneshot(authed("GET", "/v1/uploads/u1/status", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["sent_count"], 2);
    assert_eq!(body["pending_count"], 1);
    assert_eq!(
        harness.gateway.sends().await[0].message.params[3],
        "See you at 7am"
    );
}

#[tokio::test]
async fn dispatch_accepts_empty_body() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.seed_upload("u1", &["9900408811"]).await.unwrap();

    let response = router(&harness, None)
        .oneshot(authed("POST", "/v1/uploads/u1/dispatch", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["sent_count"], 1);
}

#[tokio::test]
async fn unknown_upload_is_404() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = router(&harness, None)
        .oneshot(authed("POST", "/v1/uploads/nope/dispatch", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn missing_template_is_500_with_message() {
    let harness = TestHarness::builder()
        .with_config(|c| c.whatsapp.default_template = None)
        .build()
        .await
        .unwrap();
    harness
        .seed_upload_for("u1", "agency-unknown", &["9900408811"])
        .await
        .unwrap();
    let response = router(&harness, None)
        .oneshot(authed("POST", "/v1/uploads/u1/dispatch", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("agency-unknown"));
}

#[tokio::test]
async fn single_dispatch_and_retry() {
    let gateway = MockGateway::with_outcomes(vec![MockGateway::failed("E.busy")]);
    let harness = TestHarness::builder()
        .with_gateway(gateway)
        .build()
        .await
        .unwrap();
    let rows = harness.seed_upload("u1", &["9900408811"]).await.unwrap();
    let app = router(&harness, None);

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/travelers/{}/dispatch", rows[0].id),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);

    let response = app
        .oneshot(authed(
            "POST",
            "/v1/uploads/u1/retry",
            r#"{"max_attempts": 5}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["retried_count"], 1);
    assert_eq!(body["still_failed_count"], 0);
}

#[tokio::test]
async fn phone_correction_returns_record_to_retry() {
    let harness = TestHarness::builder().build().await.unwrap();
    let rows = harness.seed_upload("u1", &["12345"]).await.unwrap();
    let app = router(&harness, None);

    app.clone()
        .oneshot(authed("POST", "/v1/uploads/u1/dispatch", ""))
        .await
        .unwrap();
    let uri = format!("/v1/travelers/{}/phone", rows[0].id);

    let response = app
        .clone()
        .oneshot(authed("PUT", &uri, r#"{"phone": "abc"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed("PUT", &uri, r#"{"phone": "9900408811"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(authed("POST", "/v1/uploads/u1/retry", ""))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["recovered_count"], 1);
    assert_eq!(harness.gateway.sent_phones().await, vec!["+919900408811"]);
}

#[tokio::test]
async fn requeue_templates_reports_count() {
    let gateway =
        MockGateway::with_outcomes(vec![MockGateway::template_required("template missing")]);
    let harness = TestHarness::builder()
        .with_gateway(gateway)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &["9900408811"]).await.unwrap();
    let app = router(&harness, None);

    app.clone()
        .oneshot(authed("POST", "/v1/uploads/u1/dispatch", ""))
        .await
        .unwrap();
    let response = app
        .oneshot(authed("POST", "/v1/uploads/u1/requeue-templates", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["requeued"], 1);
}

#[tokio::test]
async fn usage_defaults_to_today_and_rejects_bad_dates() {
    let harness = TestHarness::builder()
        .with_daily_limit(10)
        .build()
        .await
        .unwrap();
    harness.seed_upload("u1", &["9900408811"]).await.unwrap();
    let app = router(&harness, None);
    app.clone()
        .oneshot(authed("POST", "/v1/uploads/u1/dispatch", ""))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/usage", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["sent_today"], 1);
    assert_eq!(body["estimated_limit"], 10);
    assert_eq!(body["remaining"], 9);

    let response = app
        .oneshot(authed("GET", "/v1/usage?date=03-02-2026", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agency_scoped_usage_needs_agency_query() {
    let harness = TestHarness::builder()
        .with_config(|config| config.quota.scope = QuotaScope::Agency)
        .build()
        .await
        .unwrap();
    let app = router(&harness, None);

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/usage", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed("GET", "/v1/usage?agency=agency-1", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn analytics_and_day_summary() {
    let gateway = MockGateway::with_outcomes(vec![MockGateway::failed("E.busy")]);
    let harness = TestHarness::builder()
        .with_gateway(gateway)
        .build()
        .await
        .unwrap();
    harness
        .seed_upload("u1", &["9900408811", "9900408812"])
        .await
        .unwrap();
    let today = harness.calendar.today().to_string();
    let app = router(&harness, None);
    app.clone()
        .oneshot(authed("POST", "/v1/uploads/u1/dispatch", ""))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/v1/analytics/retries?date={today}"),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["1"], 1);
    assert_eq!(body["still_failed"], 1);

    let response = app
        .oneshot(authed("GET", &format!("/v1/days/{today}/summary"), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["upload_count"], 1);
    assert_eq!(body["totals"]["sent"], 1);
    assert_eq!(body["totals"]["failed"], 1);
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let harness = TestHarness::builder().build().await.unwrap();

    let response = router(&harness, None)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");

    let response = router(&harness, None)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router(&harness, Some("tripcast_messages_total 3\n"))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"tripcast_messages_total 3\n");
}
