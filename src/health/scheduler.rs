//! # 健康检查调度器
//!
//! 按 cron 表达式定时触发健康检查，同一时刻最多只有一次调度运行

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::alert::AlertDispatcher;
use super::service::HealthCheckService;
use super::types::RunSource;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};

/// 解析 cron 表达式，标准 5 段格式会补上秒字段
pub fn parse_cron_pattern(pattern: &str) -> Result<Schedule> {
    let trimmed = pattern.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };

    Schedule::from_str(&normalized)
        .map_err(|e| crate::error!(Config, format!("无效的 cron 表达式: {pattern}"), e))
}

/// 根据环境变量判断是否处于测试环境
fn is_test_environment(app_env: Option<&str>, rust_env: Option<&str>) -> bool {
    [app_env, rust_env]
        .into_iter()
        .flatten()
        .any(|value| value.eq_ignore_ascii_case("test"))
}

/// 单次调度的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 上一次运行尚未结束，本次跳过
    Skipped,
    /// 运行完成
    Completed(i32),
    /// 运行失败（持久化错误等）
    Failed,
}

/// 调度器状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub is_health_check_running: bool,
    pub cron_pattern: String,
    pub next_execution: Option<DateTime<Utc>>,
}

struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// 运行期间持有，释放时清除运行标记
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 健康检查调度器
pub struct HealthCheckScheduler {
    /// 健康检查服务
    service: Arc<HealthCheckService>,
    /// 告警分发器
    alerts: AlertDispatcher,
    /// 解析后的调度计划
    schedule: Schedule,
    /// 原始 cron 表达式
    cron_pattern: String,
    /// 是否有调度运行正在执行
    is_health_check_running: AtomicBool,
    /// 主循环句柄，停止状态为 None
    main_loop: Mutex<Option<LoopHandle>>,
}

impl HealthCheckScheduler {
    /// 创建调度器，cron 表达式无效时返回配置错误
    pub fn new(
        service: Arc<HealthCheckService>,
        alerts: AlertDispatcher,
        cron_pattern: &str,
    ) -> Result<Self> {
        let schedule = parse_cron_pattern(cron_pattern)?;
        Ok(Self {
            service,
            alerts,
            schedule,
            cron_pattern: cron_pattern.to_string(),
            is_health_check_running: AtomicBool::new(false),
            main_loop: Mutex::new(None),
        })
    }

    /// 启动调度器；测试环境下不启动。返回启动后是否处于运行状态
    pub async fn start(self: &Arc<Self>) -> bool {
        let app_env = std::env::var("APP_ENV").ok();
        let rust_env = std::env::var("RUST_ENV").ok();
        if is_test_environment(app_env.as_deref(), rust_env.as_deref()) {
            lwarn!(
                "system",
                LogStage::Scheduling,
                LogComponent::Scheduler,
                "start_refused",
                "测试环境下不启动健康检查调度器"
            );
            return self.is_running().await;
        }
        self.force_start().await
    }

    /// 忽略环境检查直接启动
    pub async fn force_start(self: &Arc<Self>) -> bool {
        let mut main_loop = self.main_loop.lock().await;
        if main_loop.is_some() {
            ldebug!(
                "system",
                LogStage::Scheduling,
                LogComponent::Scheduler,
                "start_noop",
                "调度器已在运行"
            );
            return true;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Self::run_loop(
            Arc::downgrade(self),
            self.schedule.clone(),
            cancel.clone(),
        ));
        *main_loop = Some(LoopHandle { cancel, task });

        linfo!(
            "system",
            LogStage::Scheduling,
            LogComponent::Scheduler,
            "started",
            "健康检查调度器已启动",
            cron_pattern = %self.cron_pattern
        );
        true
    }

    /// 停止调度器并等待主循环退出，正在执行的运行不会被中断
    pub async fn stop(&self) {
        let handle = self.main_loop.lock().await.take();
        let Some(LoopHandle { cancel, task }) = handle else {
            return;
        };

        cancel.cancel();
        if let Err(e) = task.await {
            lwarn!(
                "system",
                LogStage::Shutdown,
                LogComponent::Scheduler,
                "stop",
                "调度器主循环异常退出",
                error = %e
            );
        }

        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::Scheduler,
            "stopped",
            "健康检查调度器已停止"
        );
    }

    async fn run_loop(scheduler: Weak<Self>, schedule: Schedule, cancel: CancellationToken) {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                lwarn!(
                    "system",
                    LogStage::Scheduling,
                    LogComponent::Scheduler,
                    "no_upcoming",
                    "cron 表达式没有后续执行时间"
                );
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }

            let Some(scheduler) = scheduler.upgrade() else {
                break;
            };
            // 运行放到独立任务中，保证下一次触发按时到达并由运行标记判断是否跳过
            tokio::spawn(async move {
                scheduler.tick().await;
            });
        }

        ldebug!(
            "system",
            LogStage::Scheduling,
            LogComponent::Scheduler,
            "loop_exit",
            "调度器主循环结束"
        );
    }

    /// 执行一次调度运行；上一次运行未结束时跳过
    pub async fn tick(&self) -> TickOutcome {
        if self
            .is_health_check_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            lwarn!(
                "system",
                LogStage::Scheduling,
                LogComponent::Scheduler,
                "tick_skipped",
                "上一次健康检查仍在执行，跳过本次调度"
            );
            return TickOutcome::Skipped;
        }

        let outcome = {
            let _guard = RunningGuard(&self.is_health_check_running);
            self.service.run_health_checks(RunSource::SCHEDULER).await
        };

        match outcome {
            Ok(result) => {
                drop(self.alerts.dispatch(&result));
                TickOutcome::Completed(result.run_id)
            }
            Err(e) => {
                lerror!(
                    "system",
                    LogStage::Scheduling,
                    LogComponent::Scheduler,
                    "tick_failed",
                    "调度健康检查失败",
                    error = %e
                );
                TickOutcome::Failed
            }
        }
    }

    /// 主循环是否在运行
    pub async fn is_running(&self) -> bool {
        self.main_loop.lock().await.is_some()
    }

    /// 是否有调度运行正在执行
    pub fn is_health_check_running(&self) -> bool {
        self.is_health_check_running.load(Ordering::SeqCst)
    }

    /// 原始 cron 表达式
    #[must_use]
    pub fn cron_pattern(&self) -> &str {
        &self.cron_pattern
    }

    /// 当前状态快照
    pub async fn status(&self) -> SchedulerStatus {
        let is_running = self.is_running().await;
        SchedulerStatus {
            is_running,
            is_health_check_running: self.is_health_check_running(),
            cron_pattern: self.cron_pattern.clone(),
            next_execution: if is_running {
                self.schedule.upcoming(Utc).next()
            } else {
                None
            },
        }
    }
}

impl Drop for HealthCheckScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.main_loop.get_mut().as_ref() {
            handle.cancel.cancel();
        }
    }
}
