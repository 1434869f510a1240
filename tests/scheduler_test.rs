//! # 调度器集成测试

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{FixedProbe, TestApp, get, json_body};
use tower::ServiceExt;
use wonderful_books::health::{HealthProbe, HealthStatus, TickOutcome};

fn slow_probes() -> Vec<Arc<dyn HealthProbe>> {
    vec![
        Arc::new(FixedProbe::new("server", HealthStatus::Ok).with_delay(Duration::from_millis(300))),
        Arc::new(FixedProbe::new("database", HealthStatus::Ok)),
    ]
}

#[tokio::test]
async fn test_overlapping_ticks_are_skipped() {
    let app = TestApp::with_probes(slow_probes()).await;
    let scheduler = Arc::clone(&app.context.scheduler);

    let (first, second) = tokio::join!(scheduler.tick(), scheduler.tick());
    assert!(matches!(first, TickOutcome::Completed(_)));
    assert_eq!(second, TickOutcome::Skipped);

    let (runs, total) = app.context.health.history(1, 10, None).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(runs[0].source, "scheduler");
    assert!(!scheduler.is_health_check_running());
}

#[tokio::test]
async fn test_status_endpoint_reports_in_flight_run() {
    let app = TestApp::with_probes(slow_probes()).await;
    let token = app.admin_token();
    let scheduler = Arc::clone(&app.context.scheduler);

    let tick = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.tick().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/api/admin/health/scheduler", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["is_health_check_running"], true);

    assert!(matches!(tick.await.unwrap(), TickOutcome::Completed(_)));
    assert!(!scheduler.is_health_check_running());
    assert!(matches!(scheduler.tick().await, TickOutcome::Completed(_)));
}
