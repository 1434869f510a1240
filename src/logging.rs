//! # 日志配置模块
//!
//! 提供结构化日志宏与日志系统初始化。所有业务日志统一携带
//! `request_id`、`stage`、`component`、`operation` 四个字段，方便按阶段检索。

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    /// 服务启动
    Startup,
    /// 服务关闭
    Shutdown,
    /// 配置加载
    Configuration,
    /// 后台任务
    BackgroundTask,
    /// 调度
    Scheduling,
    /// 健康检查执行
    HealthCheck,
    /// 告警发送
    Alerting,
    /// 数据库读写
    Db,
    /// 外部接口调用
    ExternalApi,
    /// 认证
    Authentication,
    /// HTTP 请求处理
    Request,
    /// 内部流程
    Internal,
}

impl LogStage {
    /// 日志中使用的字符串表示
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::BackgroundTask => "background_task",
            Self::Scheduling => "scheduling",
            Self::HealthCheck => "health_check",
            Self::Alerting => "alerting",
            Self::Db => "db",
            Self::ExternalApi => "external_api",
            Self::Authentication => "authentication",
            Self::Request => "request",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 日志组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    /// 主程序
    Main,
    /// 配置管理
    Config,
    /// 数据库
    Database,
    /// 服务器初始化
    ServerSetup,
    /// 健康检查服务
    HealthChecker,
    /// 探针
    Probe,
    /// 健康检查调度器
    Scheduler,
    /// 告警分发
    Alert,
    /// 管理接口
    Management,
    /// 认证
    Auth,
}

impl LogComponent {
    /// 日志中使用的字符串表示
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Database => "database",
            Self::ServerSetup => "server_setup",
            Self::HealthChecker => "health_checker",
            Self::Probe => "probe",
            Self::Scheduler => "scheduler",
            Self::Alert => "alert",
            Self::Management => "management",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化 INFO 日志
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($fields:tt)*)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)*,)?
            "{}",
            $message
        )
    };
}

/// 结构化 WARN 日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($fields:tt)*)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)*,)?
            "{}",
            $message
        )
    };
}

/// 结构化 ERROR 日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($fields:tt)*)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)*,)?
            "{}",
            $message
        )
    };
}

/// 结构化 DEBUG 日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($fields:tt)*)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)*,)?
            "{}",
            $message
        )
    };
}

/// 初始化日志系统
pub fn init_optimized_logging(log_level: Option<&String>) {
    let level = log_level.map_or("info", String::as_str);

    // 默认关闭 SQL 语句级日志
    let default_filter = format!(
        "{level},wonderful_books=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn"
    );

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    let initialized = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if initialized.is_err() {
        // 已经有全局 subscriber（例如测试环境），直接复用
        return;
    }

    if env::var("RUST_LOG").is_ok_and(|v| {
        v.contains("sqlx::query=info") || v.contains("sqlx::query=debug")
    }) {
        tracing::info!("🔍 SQLx database query logging enabled");
    } else {
        tracing::info!("📋 SQLx database query logging disabled");
    }
}

/// 对日志中的敏感值做掩码处理
#[must_use]
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let visible: String = value.chars().take(4).collect();
    format!("{visible}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_component_names() {
        assert_eq!(LogStage::HealthCheck.to_string(), "health_check");
        assert_eq!(LogComponent::Scheduler.to_string(), "scheduler");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("sk_live_abcdef"), "sk_l***");
        assert_eq!(mask_secret("ab"), "ab***");
    }

    #[test]
    fn test_macros_expand() {
        linfo!("system", LogStage::Startup, LogComponent::Main, "unit_test", "plain message");
        lwarn!(
            "system",
            LogStage::HealthCheck,
            LogComponent::Probe,
            "unit_test",
            "with fields",
            probe = "database",
            duration_ms = 12_u64
        );
    }
}
