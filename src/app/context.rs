//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::JwtManager;
use crate::config::AppConfig;
use crate::error::Result;
use crate::health::{AlertDispatcher, HealthCheckScheduler, HealthCheckService, ProbeRegistry};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub health: Arc<HealthCheckService>,
    pub scheduler: Arc<HealthCheckScheduler>,
    pub alerts: AlertDispatcher,
    pub jwt: Arc<JwtManager>,
}

impl AppContext {
    /// 使用标准探针注册表构建上下文
    pub fn build(config: AppConfig, db: DatabaseConnection) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.health.http_timeout_secs))
            .user_agent(concat!("wonderful-books-health/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::error!(Internal, "HTTP client build failed", e))?;
        let registry = ProbeRegistry::standard(&config, db.clone(), http);
        Self::with_registry(config, db, registry)
    }

    /// 使用自定义探针注册表构建上下文
    pub fn with_registry(
        config: AppConfig,
        db: DatabaseConnection,
        registry: ProbeRegistry,
    ) -> Result<Self> {
        let alerts = AlertDispatcher::from_config(&config.alerts, &config.smtp);
        let jwt = Arc::new(JwtManager::new(&config.auth));
        let health = Arc::new(HealthCheckService::new(db.clone(), registry));
        let scheduler = Arc::new(HealthCheckScheduler::new(
            Arc::clone(&health),
            alerts.clone(),
            &config.health.cron_pattern,
        )?);

        Ok(Self {
            config: Arc::new(config),
            db,
            health,
            scheduler,
            alerts,
            jwt,
        })
    }
}
