//! # 健康检查 HTTP 接口集成测试
//!
//! 通过 `tower::ServiceExt::oneshot` 直接驱动路由，覆盖公开接口、管理员认证与管理接口

mod common;

use axum::http::StatusCode;
use common::{
    TestApp, billing_down_probes, external_slow_probes, get, healthy_probes, json_body, post,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_ping_is_always_ok() {
    let app = TestApp::with_probes(healthy_probes()).await;

    let response = app.router.clone().oneshot(get("/ping", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_healthz_without_runs_is_ok() {
    let app = TestApp::with_probes(healthy_probes()).await;

    let response = app.router.clone().oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "UNKNOWN");
}

#[tokio::test]
async fn test_latest_health_404_without_runs() {
    let app = TestApp::with_probes(healthy_probes()).await;

    let response = app.router.clone().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
}

#[tokio::test]
async fn test_manual_run_requires_admin() {
    let app = TestApp::with_probes(healthy_probes()).await;

    let missing = app
        .router
        .clone()
        .oneshot(post("/api/health/run", None, None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .router
        .clone()
        .oneshot(post("/api/health/run", Some("not-a-jwt"), None))
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let reader = app.token("reader");
    let forbidden = app
        .router
        .clone()
        .oneshot(post("/api/health/run", Some(&reader), None))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(forbidden).await["error"]["code"], "PERMISSION_ERROR");
}

#[tokio::test]
async fn test_billing_outage_flips_healthz_to_503() {
    let app = TestApp::with_probes(billing_down_probes()).await;
    let token = app.admin_token();

    let response = app
        .router
        .clone()
        .oneshot(post("/api/health/run", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let run = &body["data"];
    assert_eq!(run["overall_status"], "FAIL");
    assert_eq!(run["source"], "manual");
    let items = run["items"].as_array().unwrap();
    assert_eq!(items.len(), 6);

    let billing = items.iter().find(|item| item["name"] == "billing").unwrap();
    assert_eq!(billing["status"], "FAIL");
    assert_eq!(billing["meta"]["error_kind"], "network");
    assert!(!billing["message"].as_str().unwrap().contains("sk_test_123"));

    let healthz = app.router.clone().oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(healthz.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(healthz).await["status"], "FAIL");

    let latest = app.router.clone().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(latest.status(), StatusCode::OK);
    assert_eq!(json_body(latest).await["data"]["run_id"], run["run_id"]);
}

#[tokio::test]
async fn test_healthy_run_keeps_healthz_ok() {
    let app = TestApp::with_probes(healthy_probes()).await;
    let token = app.admin_token();

    let response = app
        .router
        .clone()
        .oneshot(post("/api/health/run", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["data"]["overall_status"], "OK");

    let healthz = app.router.clone().oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(healthz.status(), StatusCode::OK);
    assert_eq!(json_body(healthz).await["status"], "OK");
}

#[tokio::test]
async fn test_warn_run_keeps_healthz_ok() {
    let app = TestApp::with_probes(external_slow_probes()).await;
    let token = app.admin_token();

    let response = app
        .router
        .clone()
        .oneshot(post("/api/health/run", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["overall_status"], "WARN");

    let healthz = app.router.clone().oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(healthz.status(), StatusCode::OK);
    assert_eq!(json_body(healthz).await["status"], "WARN");
}

#[tokio::test]
async fn test_history_and_detail() {
    let app = TestApp::with_probes(billing_down_probes()).await;
    let token = app.admin_token();

    for _ in 0..3 {
        app.context.health.run_health_checks("scheduler").await.unwrap();
    }

    let response = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/history?page=1&limit=2", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);

    let first_id = body["data"][0]["id"].as_i64().unwrap();
    let detail = app
        .router
        .clone()
        .oneshot(get(&format!("/api/admin/health/history/{first_id}"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    assert_eq!(
        json_body(detail).await["data"]["items"].as_array().unwrap().len(),
        6
    );

    let missing = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/history/9999", Some(&token)))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let filtered = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/history?status=ok", Some(&token)))
        .await
        .unwrap();
    assert_eq!(json_body(filtered).await["pagination"]["total"], 0);

    let invalid = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/history?status=bogus", Some(&token)))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_window_validation() {
    let app = TestApp::with_probes(healthy_probes()).await;
    let token = app.admin_token();
    app.context.health.run_health_checks("manual").await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/stats", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = json_body(response).await;
    assert_eq!(stats["data"]["days"], 7);
    assert_eq!(stats["data"]["total_runs"], 1);
    assert_eq!(stats["data"]["uptime_percentage"], 100.0);

    for days in ["0", "91"] {
        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/api/admin/health/stats?days={days}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_scheduler_status_and_control() {
    let app = TestApp::with_probes(healthy_probes()).await;
    let token = app.admin_token();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/scheduler", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["data"]["is_running"], false);
    assert_eq!(status["data"]["is_health_check_running"], false);
    assert_eq!(status["data"]["cron_pattern"], "0 */5 * * * *");

    let started = app
        .router
        .clone()
        .oneshot(post("/api/admin/health/scheduler/start", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(started.status(), StatusCode::OK);
    assert_eq!(
        json_body(started).await["data"]["is_running"],
        app.context.scheduler.is_running().await
    );

    let stopped = app
        .router
        .clone()
        .oneshot(post("/api/admin/health/scheduler/stop", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(stopped.status(), StatusCode::OK);
    assert_eq!(json_body(stopped).await["data"]["is_running"], false);
}

#[tokio::test]
async fn test_cleanup_endpoint() {
    let app = TestApp::with_probes(healthy_probes()).await;
    let token = app.admin_token();
    app.context.health.run_health_checks("manual").await.unwrap();

    let default_window = app
        .router
        .clone()
        .oneshot(post("/api/admin/health/cleanup", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(default_window.status(), StatusCode::OK);
    let body = json_body(default_window).await;
    assert_eq!(body["data"]["deleted"], 0);
    assert_eq!(body["data"]["retention_days"], 30);

    let invalid = app
        .router
        .clone()
        .oneshot(post(
            "/api/admin/health/cleanup",
            Some(&token),
            Some(json!({ "retention_days": 0 })),
        ))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let unauthenticated = app
        .router
        .clone()
        .oneshot(post("/api/admin/health/cleanup", None, None))
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
}
