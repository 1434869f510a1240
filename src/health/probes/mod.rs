//! # 健康探针
//!
//! 每个探针检查一个外部依赖，返回 [`ProbeReport`] 或带类别的 [`ProbeError`]。
//! 标准注册表固定包含六个探针：server、database、billing、mail、storage、external。

mod billing;
mod database;
mod external;
mod mail;
mod server;
mod storage;

pub use billing::BillingProbe;
pub use database::DatabaseProbe;
pub use external::ExternalProbe;
pub use mail::{MailProbe, plain_message, smtp_transport, test_email_target};
pub use server::ServerProbe;
pub use storage::{LocalDirStore, ScratchStore, StorageProbe};

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{HealthStatus, ProbeError, ProbeReport, RunSource};
use crate::config::AppConfig;
use crate::error::Result;

/// 持久化消息的最大长度（字符）
pub const MAX_MESSAGE_LEN: usize = 200;

/// 消息中出现这些标记时，其后的内容全部丢弃
const SECRET_MARKERS: [&str; 3] = ["password=", "key=", "token="];

/// 探针执行上下文
#[derive(Debug, Clone)]
pub struct ProbeContext {
    /// 运行来源
    pub source: String,
    /// 是否为手动触发
    pub manual: bool,
}

impl ProbeContext {
    /// 根据运行来源构造上下文
    pub fn for_source(source: &str) -> Self {
        Self {
            source: source.to_string(),
            manual: source == RunSource::MANUAL,
        }
    }
}

/// 健康探针
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// 探针名称，在注册表中唯一
    fn name(&self) -> &str;

    /// 执行一次检查
    async fn check(&self, ctx: &ProbeContext) -> std::result::Result<ProbeReport, ProbeError>;
}

/// 按耗时分级：`< ok_below` 为 OK，`< warn_below` 为 WARN，否则 FAIL
#[must_use]
pub const fn classify(elapsed_ms: u64, ok_below: u64, warn_below: u64) -> HealthStatus {
    if elapsed_ms < ok_below {
        HealthStatus::Ok
    } else if elapsed_ms < warn_below {
        HealthStatus::Warn
    } else {
        HealthStatus::Fail
    }
}

/// 清理将要持久化的消息：去掉凭据并限制长度
#[must_use]
pub fn sanitize_message(message: &str) -> String {
    let lowered = message.to_ascii_lowercase();
    let cut = SECRET_MARKERS
        .iter()
        .filter_map(|marker| lowered.find(marker).map(|pos| pos + marker.len()))
        .min();

    let mut cleaned = match cut {
        Some(end) => format!("{}***", &message[..end]),
        None => message.to_string(),
    };

    if cleaned.chars().count() > MAX_MESSAGE_LEN {
        cleaned = cleaned.chars().take(MAX_MESSAGE_LEN).collect();
    }
    cleaned
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// 计时执行一次 GET 请求，返回状态码与耗时
pub(crate) async fn timed_get(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> std::result::Result<(reqwest::Response, u64), ProbeError> {
    let start = Instant::now();
    let response = request.timeout(timeout).send().await?;
    Ok((response, elapsed_ms(start)))
}

/// 探针注册表
#[derive(Clone)]
pub struct ProbeRegistry {
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("probes", &self.names())
            .finish()
    }
}

impl ProbeRegistry {
    /// 从任意探针构建注册表，名称重复时报错
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for probe in &probes {
            if !seen.insert(probe.name().to_string()) {
                crate::bail!(Config, "重复的健康探针名称: {}", probe.name());
            }
        }
        Ok(Self { probes })
    }

    /// 构建标准的六个探针
    #[must_use]
    pub fn standard(config: &AppConfig, db: DatabaseConnection, http: reqwest::Client) -> Self {
        let timeout = Duration::from_secs(config.health.http_timeout_secs);
        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(ServerProbe::new(http.clone(), config.self_base_url(), timeout)),
            Arc::new(DatabaseProbe::new(db)),
            Arc::new(BillingProbe::new(
                http.clone(),
                config.billing.api_base.clone(),
                config.billing.secret_key.clone(),
                Duration::from_secs(config.billing.timeout_secs),
            )),
            Arc::new(MailProbe::new(
                config.smtp.clone(),
                config.health.test_email_recipient.clone(),
            )),
            Arc::new(StorageProbe::new(&config.health.storage_path)),
            Arc::new(ExternalProbe::new(
                http,
                config.health.external_ping_url.clone(),
                timeout,
            )),
        ];
        Self { probes }
    }

    /// 全部探针，按注册顺序
    #[must_use]
    pub fn probes(&self) -> &[Arc<dyn HealthProbe>] {
        &self.probes
    }

    /// 全部探针名称，按注册顺序
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.probes.iter().map(|p| p.name().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}
