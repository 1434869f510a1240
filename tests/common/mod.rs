//! 集成测试公共工具

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use wonderful_books::app::AppContext;
use wonderful_books::auth::JwtManager;
use wonderful_books::config::AppConfig;
use wonderful_books::health::{
    HealthProbe, HealthStatus, ProbeContext, ProbeError, ProbeErrorKind, ProbeRegistry,
    ProbeReport,
};
use wonderful_books::management::{AppState, build_router};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// 固定状态探针
pub struct FixedProbe {
    name: String,
    status: HealthStatus,
    delay: Duration,
}

impl FixedProbe {
    pub fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl HealthProbe for FixedProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        tokio::time::sleep(self.delay).await;
        Ok(ProbeReport::new(self.status, 5, format!("{} fine", self.name)))
    }
}

/// 总是报错的探针
pub struct BrokenProbe(pub &'static str);

#[async_trait]
impl HealthProbe for BrokenProbe {
    fn name(&self) -> &str {
        self.0
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        Err(ProbeError::new(
            ProbeErrorKind::Network,
            "connection refused, key=sk_test_123",
        ))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.alerts.enabled = false;
    config.health.scheduler_enabled = false;
    config.health.auto_cleanup = false;
    config
}

pub async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// 六个探针全部正常
pub fn healthy_probes() -> Vec<Arc<dyn HealthProbe>> {
    ["server", "database", "billing", "mail", "storage", "external"]
        .into_iter()
        .map(|name| Arc::new(FixedProbe::new(name, HealthStatus::Ok)) as Arc<dyn HealthProbe>)
        .collect()
}

/// external 变慢，其余正常
pub fn external_slow_probes() -> Vec<Arc<dyn HealthProbe>> {
    ["server", "database", "billing", "mail", "storage"]
        .into_iter()
        .map(|name| Arc::new(FixedProbe::new(name, HealthStatus::Ok)) as Arc<dyn HealthProbe>)
        .chain(std::iter::once(
            Arc::new(FixedProbe::new("external", HealthStatus::Warn)) as Arc<dyn HealthProbe>,
        ))
        .collect()
}

/// billing 不可用，其余正常
pub fn billing_down_probes() -> Vec<Arc<dyn HealthProbe>> {
    vec![
        Arc::new(FixedProbe::new("server", HealthStatus::Ok)),
        Arc::new(FixedProbe::new("database", HealthStatus::Ok)),
        Arc::new(BrokenProbe("billing")),
        Arc::new(FixedProbe::new("mail", HealthStatus::Ok)),
        Arc::new(FixedProbe::new("storage", HealthStatus::Ok)),
        Arc::new(FixedProbe::new("external", HealthStatus::Warn)),
    ]
}

pub struct TestApp {
    pub context: Arc<AppContext>,
    pub router: Router,
}

impl TestApp {
    pub async fn with_probes(probes: Vec<Arc<dyn HealthProbe>>) -> Self {
        let config = test_config();
        let db = memory_db().await;
        let registry = ProbeRegistry::new(probes).unwrap();
        let context = Arc::new(AppContext::with_registry(config, db, registry).unwrap());
        let router = build_router(AppState::new(Arc::clone(&context)), &context.config.server);
        Self { context, router }
    }

    pub fn token(&self, role: &str) -> String {
        JwtManager::new(&self.context.config.auth)
            .generate_token("ops@wonderfulbooks.test", role, chrono::Duration::hours(1))
            .unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token("admin")
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, Body::empty())
}

pub fn post(uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
    request("POST", uri, token, body)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
