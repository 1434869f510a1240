use crate::app::context::AppContext;
use crate::app::task_scheduler::{ScheduledTask, TaskScheduler};
use crate::error::Result;
use crate::health::HealthRetentionCleanupTask;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 后台任务类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// cron 驱动的健康检查调度
    HealthCheckScheduler,
    /// 过期健康检查记录清理
    HealthRetentionCleanup,
}

/// 后台任务集合：调度器及任务实例统一管理
pub struct AppTasks {
    scheduler: Arc<TaskScheduler>,
    /// 任务实例注册表：通过任务类型查找具体的任务实例
    task_instances: HashMap<TaskType, Arc<dyn Any + Send + Sync>>,
}

impl AppTasks {
    /// 初始化调度器并按配置注册后台任务
    pub async fn initialize(context: &AppContext) -> Result<Arc<Self>> {
        let scheduler = Arc::new(TaskScheduler::new());
        let mut task_instances: HashMap<TaskType, Arc<dyn Any + Send + Sync>> = HashMap::new();
        let mut tasks = Vec::new();

        if context.config.health.scheduler_enabled {
            let health_scheduler = Arc::clone(&context.scheduler);
            task_instances.insert(TaskType::HealthCheckScheduler, health_scheduler.clone());
            tasks.push(
                ScheduledTask::builder(TaskType::HealthCheckScheduler)
                    .on_start({
                        let health_scheduler = health_scheduler.clone();
                        move || {
                            let health_scheduler = health_scheduler.clone();
                            async move {
                                health_scheduler.start().await;
                                Ok(())
                            }
                        }
                    })
                    .on_stop(move || {
                        let health_scheduler = health_scheduler.clone();
                        async move {
                            health_scheduler.stop().await;
                            Ok(())
                        }
                    })
                    .build()?,
            );
        }

        if context.config.health.auto_cleanup {
            let cleanup = Arc::new(HealthRetentionCleanupTask::new(
                &context.health,
                context.config.health.retention_days,
                Duration::from_secs(context.config.health.cleanup_interval_hours.max(1) * 3600),
            ));
            task_instances.insert(TaskType::HealthRetentionCleanup, cleanup.clone());
            tasks.push(
                ScheduledTask::builder(TaskType::HealthRetentionCleanup)
                    .on_start({
                        let task = cleanup.clone();
                        move || {
                            let task = task.clone();
                            async move { task.start().await }
                        }
                    })
                    .on_stop(move || {
                        let task = cleanup.clone();
                        async move {
                            task.stop().await;
                            Ok(())
                        }
                    })
                    .build()?,
            );
        }

        scheduler.register_many(tasks).await;

        Ok(Arc::new(Self {
            scheduler,
            task_instances,
        }))
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<TaskScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// 获取指定类型的任务实例
    #[must_use]
    pub fn get_task<T: Send + Sync + 'static>(&self, task_type: TaskType) -> Option<Arc<T>> {
        self.task_instances
            .get(&task_type)
            .and_then(|any| Arc::clone(any).downcast::<T>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::health::HealthCheckScheduler;
    use crate::testing::helpers::create_test_db;

    #[tokio::test]
    async fn test_tasks_follow_config() {
        let db = create_test_db().await.unwrap();
        let context = AppContext::build(AppConfig::default(), db.clone()).unwrap();
        let tasks = AppTasks::initialize(&context).await.unwrap();
        assert_eq!(
            tasks.scheduler().task_types().await,
            vec![TaskType::HealthCheckScheduler, TaskType::HealthRetentionCleanup]
        );
        assert!(tasks
            .get_task::<HealthCheckScheduler>(TaskType::HealthCheckScheduler)
            .is_some());
        assert!(tasks
            .get_task::<HealthRetentionCleanupTask>(TaskType::HealthRetentionCleanup)
            .is_some());

        let mut config = AppConfig::default();
        config.health.scheduler_enabled = false;
        config.health.auto_cleanup = false;
        let context = AppContext::build(config, db).unwrap();
        let tasks = AppTasks::initialize(&context).await.unwrap();
        assert!(tasks.scheduler().task_types().await.is_empty());
    }
}
