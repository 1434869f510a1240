//! # HTTP 服务器
//!
//! Axum 服务器，挂载公开健康接口与管理接口

use std::future::Future;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health, system};
use super::middleware::request_id_middleware;
use crate::app::context::AppContext;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};

/// 服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 构建完整路由，测试中可直接使用
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = super::routes::create_routes(state.clone());

    let app = Router::new()
        .route("/", get(system::root_handler))
        .route("/ping", get(system::ping_handler))
        .route("/healthz", get(health::healthz))
        .nest("/api", api_routes)
        .with_state(state);

    let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());
    let app = if config.enable_cors {
        app.layer(service_builder.layer(cors_layer(&config.cors_origins)))
    } else {
        app.layer(service_builder)
    };

    app.layer(axum::middleware::from_fn(request_id_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let parsed = origins
        .iter()
        .map(|origin| origin.parse::<axum::http::HeaderValue>())
        .collect::<std::result::Result<Vec<_>, _>>();

    match parsed {
        Ok(origins) => layer.allow_origin(origins),
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::ServerSetup,
                "cors_config_fail",
                "CORS 源配置无效，回退为允许任意源",
                error = %e
            );
            layer.allow_origin(Any)
        }
    }
}

/// HTTP 服务器
pub struct ManagementServer {
    addr: SocketAddr,
    router: Router,
}

impl ManagementServer {
    /// 创建服务器，解析监听地址并构建路由
    pub fn new(config: &ServerConfig, context: Arc<AppContext>) -> Result<Self> {
        let ip = config.host.parse::<std::net::IpAddr>().map_err(|e| {
            crate::error!(Config, format!("监听地址无效 '{}'", config.host), e)
        })?;
        let router = build_router(AppState::new(context), config);

        Ok(Self {
            addr: SocketAddr::new(ip, config.port),
            router,
        })
    }

    /// 启动服务器，`shutdown` 完成后优雅退出
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.addr).await?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            format!("HTTP 服务器启动于 {}", self.addr)
        );

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error!(Network, "HTTP 服务器异常退出", e))?;

        Ok(())
    }
}
