//! # 测试 Mock 对象
//!
//! 提供可控行为的健康探针

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::health::probes::{HealthProbe, ProbeContext};
use crate::health::types::{HealthStatus, ProbeError, ProbeErrorKind, ProbeReport};

/// 返回固定状态的探针，可选延迟
#[derive(Debug, Clone)]
pub struct StaticProbe {
    name: String,
    status: HealthStatus,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StaticProbe {
    pub fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(name: &str) -> Self {
        Self::new(name, HealthStatus::Ok)
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 调用计数，克隆后共享
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let duration_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
        Ok(ProbeReport::new(
            self.status,
            duration_ms,
            format!("{} {}", self.name, self.status),
        ))
    }
}

/// 始终返回错误的探针
#[derive(Debug, Clone)]
pub struct FailingProbe {
    name: String,
    kind: ProbeErrorKind,
    message: String,
}

impl FailingProbe {
    pub fn new(name: &str, kind: ProbeErrorKind, message: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for FailingProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        Err(ProbeError::new(self.kind, self.message.clone()))
    }
}

/// 执行时 panic 的探针
#[derive(Debug, Clone)]
pub struct PanickingProbe {
    name: String,
}

impl PanickingProbe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for PanickingProbe {
    fn name(&self) -> &str {
        &self.name
    }

    #[allow(clippy::panic)]
    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        panic!("probe {} exploded", self.name)
    }
}
