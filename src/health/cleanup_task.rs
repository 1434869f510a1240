//! # 健康检查记录保留清理任务

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use super::service::HealthCheckService;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo};

/// 按固定间隔删除超过保留期的运行记录
#[derive(Clone)]
pub struct HealthRetentionCleanupTask {
    service: Weak<HealthCheckService>,
    retention_days: u32,
    period: Duration,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl HealthRetentionCleanupTask {
    #[must_use]
    pub fn new(service: &Arc<HealthCheckService>, retention_days: u32, period: Duration) -> Self {
        Self {
            service: Arc::downgrade(service),
            retention_days,
            period,
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut guard = self.task_handle.write().await;
        if guard.is_some() {
            return Ok(());
        }
        if self.service.upgrade().is_none() {
            crate::bail!(Internal, "HealthCheckService 已被释放，无法启动清理任务");
        }

        *guard = Some(tokio::spawn(run(
            self.service.clone(),
            self.retention_days,
            self.period,
        )));

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::HealthChecker,
            "retention_cleanup_started",
            "Health retention cleanup task started",
            retention_days = self.retention_days,
            period_secs = self.period.as_secs()
        );
        Ok(())
    }

    pub async fn stop(&self) {
        let handle = self.task_handle.write().await.take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::HealthChecker,
            "retention_cleanup_stopped",
            "Health retention cleanup task stopped"
        );
    }

    pub async fn is_running(&self) -> bool {
        self.task_handle.read().await.is_some()
    }
}

async fn run(service: Weak<HealthCheckService>, retention_days: u32, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // 首次 tick 立即返回，启动时先清理一次
        ticker.tick().await;

        let Some(service) = service.upgrade() else {
            break;
        };

        if let Err(e) = service.cleanup(retention_days).await {
            lerror!(
                "system",
                LogStage::BackgroundTask,
                LogComponent::HealthChecker,
                "retention_cleanup_failed",
                "Health retention cleanup failed",
                error = %e
            );
        }
    }
}
