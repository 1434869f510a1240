//! # 路由配置
//!
//! `/api` 下的公开健康接口与需要管理员令牌的管理接口

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use super::handlers::health;
use super::middleware::admin_auth;
use super::server::AppState;

/// 创建 `/api` 路由
pub fn create_routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health::latest_health));

    let admin = Router::new()
        .route("/health/run", post(health::run_health_checks))
        .nest("/admin/health", admin_health_routes())
        .route_layer(from_fn_with_state(state, admin_auth));

    public.merge(admin)
}

/// 管理端健康路由
fn admin_health_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(health::health_stats))
        .route("/history", get(health::health_history))
        .route("/history/{id}", get(health::health_run_detail))
        .route("/scheduler", get(health::scheduler_status))
        .route("/scheduler/start", post(health::scheduler_start))
        .route("/scheduler/stop", post(health::scheduler_stop))
        .route("/cleanup", post(health::cleanup_history))
}
