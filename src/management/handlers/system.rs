//! # 系统信息处理器

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use crate::management::response;
use crate::management::server::AppState;

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    probes: Vec<String>,
    cron_pattern: String,
}

/// 存活探测，不访问任何依赖
pub async fn ping_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// 根路径：服务基本信息
pub async fn root_handler(State(state): State<AppState>) -> axum::response::Response {
    response::success(ServiceInfo {
        name: "Wonderful Books Health",
        version: env!("CARGO_PKG_VERSION"),
        probes: state.health.registry().names(),
        cron_pattern: state.scheduler.cron_pattern().to_string(),
    })
}
