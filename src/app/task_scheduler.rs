//! # 后台任务调度器
//!
//! 统一注册、启动与停止后台任务（健康检查调度器、保留期清理）。

use crate::app::tasks::TaskType;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo, lwarn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type TaskAction = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// 调度任务定义
#[derive(Clone)]
pub struct ScheduledTask {
    task_type: TaskType,
    start: TaskAction,
    stop: Option<TaskAction>,
}

impl ScheduledTask {
    /// 创建任务构建器
    #[must_use]
    pub fn builder(task_type: TaskType) -> ScheduledTaskBuilder {
        ScheduledTaskBuilder {
            task_type,
            start: None,
            stop: None,
        }
    }

    /// 启动任务
    async fn start(&self) -> Result<()> {
        linfo!(
            "system",
            LogStage::BackgroundTask,
            LogComponent::Scheduler,
            "task_start",
            "Starting background task",
            task = ?self.task_type
        );
        (self.start)().await
    }

    /// 停止任务
    async fn stop(&self) -> Result<()> {
        if let Some(action) = &self.stop {
            linfo!(
                "system",
                LogStage::Shutdown,
                LogComponent::Scheduler,
                "task_stop",
                "Stopping background task",
                task = ?self.task_type
            );
            action().await
        } else {
            lwarn!(
                "system",
                LogStage::Shutdown,
                LogComponent::Scheduler,
                "task_stop_skipped",
                "No shutdown hook registered for background task",
                task = ?self.task_type
            );
            Ok(())
        }
    }
}

/// 任务构建器
pub struct ScheduledTaskBuilder {
    task_type: TaskType,
    start: Option<TaskAction>,
    stop: Option<TaskAction>,
}

impl ScheduledTaskBuilder {
    /// 注册启动逻辑
    #[must_use]
    pub fn on_start<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.start = Some(Arc::new(move || Box::pin(action())));
        self
    }

    /// 注册停止逻辑
    #[must_use]
    pub fn on_stop<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.stop = Some(Arc::new(move || Box::pin(action())));
        self
    }

    /// 构建最终任务，缺少启动逻辑时报错
    pub fn build(self) -> Result<ScheduledTask> {
        let Some(start) = self.start else {
            crate::bail!(Internal, "后台任务 {:?} 缺少启动逻辑", self.task_type);
        };
        Ok(ScheduledTask {
            task_type: self.task_type,
            start,
            stop: self.stop,
        })
    }
}

/// 后台任务调度器
#[derive(Default)]
pub struct TaskScheduler {
    tasks: RwLock<Vec<ScheduledTask>>,
}

impl TaskScheduler {
    /// 创建新的调度器
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// 注册任务
    pub async fn register(&self, task: ScheduledTask) {
        let mut guard = self.tasks.write().await;
        guard.push(task);
    }

    /// 批量注册任务
    pub async fn register_many(&self, tasks: Vec<ScheduledTask>) {
        let mut guard = self.tasks.write().await;
        guard.extend(tasks);
    }

    /// 已注册的任务类型，按注册顺序
    pub async fn task_types(&self) -> Vec<TaskType> {
        self.tasks.read().await.iter().map(|t| t.task_type).collect()
    }

    /// 启动所有任务
    pub async fn start_all(&self) -> Result<()> {
        let tasks = { self.tasks.read().await.clone() };
        for task in tasks {
            if let Err(err) = task.start().await {
                lerror!(
                    "system",
                    LogStage::BackgroundTask,
                    LogComponent::Scheduler,
                    "task_start_failed",
                    "Background task failed to start",
                    task = ?task.task_type,
                    error = %err
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// 停止所有任务（逆序执行）
    pub async fn shutdown(&self) -> Result<()> {
        let tasks = { self.tasks.read().await.clone() };
        for task in tasks.into_iter().rev() {
            if let Err(err) = task.stop().await {
                lerror!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::Scheduler,
                    "task_stop_failed",
                    "Background task failed to stop cleanly",
                    task = ?task.task_type,
                    error = %err
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_task(task_type: TaskType, log: &Arc<Mutex<Vec<String>>>) -> ScheduledTask {
        let start_log = Arc::clone(log);
        let stop_log = Arc::clone(log);
        ScheduledTask::builder(task_type)
            .on_start(move || {
                let log = Arc::clone(&start_log);
                async move {
                    log.lock().unwrap().push(format!("start {task_type:?}"));
                    Ok(())
                }
            })
            .on_stop(move || {
                let log = Arc::clone(&stop_log);
                async move {
                    log.lock().unwrap().push(format!("stop {task_type:?}"));
                    Ok(())
                }
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_in_order_stop_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = TaskScheduler::new();
        scheduler
            .register_many(vec![
                recording_task(TaskType::HealthCheckScheduler, &log),
                recording_task(TaskType::HealthRetentionCleanup, &log),
            ])
            .await;

        scheduler.start_all().await.unwrap();
        scheduler.shutdown().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "start HealthCheckScheduler",
                "start HealthRetentionCleanup",
                "stop HealthRetentionCleanup",
                "stop HealthCheckScheduler",
            ]
        );
    }

    #[test]
    fn test_build_requires_start() {
        assert!(ScheduledTask::builder(TaskType::HealthCheckScheduler)
            .build()
            .is_err());
    }

    #[tokio::test]
    async fn test_start_failure_propagates() {
        let scheduler = TaskScheduler::new();
        scheduler
            .register(
                ScheduledTask::builder(TaskType::HealthRetentionCleanup)
                    .on_start(|| async { Err(crate::error!(Internal, "boom")) })
                    .build()
                    .unwrap(),
            )
            .await;

        assert!(scheduler.start_all().await.is_err());
        assert_eq!(
            scheduler.task_types().await,
            vec![TaskType::HealthRetentionCleanup]
        );
    }
}
