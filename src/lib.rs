//! # Wonderful Books 健康检查聚合服务
//!
//! 并发执行依赖探针、持久化运行记录、按 cron 调度并在状态变化时发送告警。

pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod management;
pub mod server_setup;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, Result};
