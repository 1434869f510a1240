//! 健康检查相关处理器

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::health::{HealthStatus, RunSource};
use crate::logging::{LogComponent, LogStage};
use crate::management::response::{self, Pagination};
use crate::management::server::AppState;
use crate::{lerror, linfo};

/// 统计窗口默认天数
pub const DEFAULT_STATS_DAYS: u32 = 7;
/// 统计窗口最大天数
pub const MAX_STATS_DAYS: u32 = 90;
/// 历史查询默认条数
pub const DEFAULT_HISTORY_LIMIT: u64 = 20;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    pub retention_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
    pub retention_days: u32,
}

/// 负载均衡健康检查：最近一次运行为 FAIL 时返回 503
pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.health.latest_status().await {
        Ok(status) => {
            let code = if status == Some(HealthStatus::Fail) {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            let label = status.map_or("UNKNOWN", HealthStatus::as_str);
            (
                code,
                Json(json!({
                    "status": label,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Request,
                LogComponent::Management,
                "healthz_failed",
                "读取最近健康状态失败",
                error = %e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "ERROR",
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
    }
}

/// 最近一次运行及其明细
pub async fn latest_health(State(state): State<AppState>) -> Response {
    match state.health.latest_run().await {
        Ok(Some(run)) => response::success(run),
        Ok(None) => response::app_error(crate::error!(NotFound, "尚无健康检查记录")),
        Err(e) => response::app_error(e),
    }
}

/// 手动触发一次健康检查
pub async fn run_health_checks(State(state): State<AppState>) -> Response {
    match state.health.run_health_checks(RunSource::MANUAL).await {
        Ok(run) => {
            drop(state.alerts.dispatch(&run));
            linfo!(
                "system",
                LogStage::Request,
                LogComponent::Management,
                "manual_run",
                "手动健康检查完成",
                run_id = run.run_id,
                overall_status = %run.overall_status
            );
            response::success_with_message(run, "健康检查已完成")
        }
        Err(e) => response::app_error(e),
    }
}

/// 统计信息
pub async fn health_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS);
    if !(1..=MAX_STATS_DAYS).contains(&days) {
        return response::app_error(crate::error!(
            Validation,
            format!("days 必须在 1 到 {MAX_STATS_DAYS} 之间")
        ));
    }

    match state.health.stats(days).await {
        Ok(stats) => response::success(stats),
        Err(e) => response::app_error(e),
    }
}

/// 分页历史
pub async fn health_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let status_filter = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<HealthStatus>() {
            Ok(status) => Some(status),
            Err(e) => return response::app_error(e),
        },
        None => None,
    };
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, crate::health::service::MAX_HISTORY_LIMIT);

    match state.health.history(page, limit, status_filter).await {
        Ok((runs, total)) => response::paginated(runs, Pagination::new(page, limit, total)),
        Err(e) => response::app_error(e),
    }
}

/// 单次运行详情
pub async fn health_run_detail(State(state): State<AppState>, Path(run_id): Path<i32>) -> Response {
    match state.health.run_detail(run_id).await {
        Ok(Some(run)) => response::success(run),
        Ok(None) => response::app_error(crate::error!(
            NotFound,
            format!("健康检查记录不存在: {run_id}")
        )),
        Err(e) => response::app_error(e),
    }
}

/// 调度器状态
pub async fn scheduler_status(State(state): State<AppState>) -> Response {
    response::success(state.scheduler.status().await)
}

/// 启动调度器
pub async fn scheduler_start(State(state): State<AppState>) -> Response {
    state.scheduler.start().await;
    response::success(state.scheduler.status().await)
}

/// 停止调度器
pub async fn scheduler_stop(State(state): State<AppState>) -> Response {
    state.scheduler.stop().await;
    response::success(state.scheduler.status().await)
}

/// 清理过期记录，未指定保留天数时使用配置值
pub async fn cleanup_history(State(state): State<AppState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CleanupRequest::default()
    } else {
        match serde_json::from_slice::<CleanupRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return response::app_error(crate::error!(Validation, "请求体格式错误", e));
            }
        }
    };

    let retention_days = request
        .retention_days
        .unwrap_or(state.config.health.retention_days);

    match state.health.cleanup(retention_days).await {
        Ok(deleted) => response::success(CleanupResponse {
            deleted,
            retention_days,
        }),
        Err(e) => response::app_error(e),
    }
}
