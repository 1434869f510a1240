//! # 健康检查模块
//!
//! 聚合六个依赖探针的结果，按计划定时执行并持久化，必要时发送告警

pub mod alert;
pub mod cleanup_task;
pub mod probes;
pub mod scheduler;
pub mod service;
pub mod types;

pub use alert::{AlertChannel, AlertDispatcher, AlertMessage, should_alert};
pub use cleanup_task::HealthRetentionCleanupTask;
pub use probes::{HealthProbe, ProbeContext, ProbeRegistry};
pub use scheduler::{HealthCheckScheduler, SchedulerStatus, TickOutcome, parse_cron_pattern};
pub use service::HealthCheckService;
pub use types::*;
