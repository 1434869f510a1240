//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖与验证

mod app_config;
mod database;
mod manager;

pub use app_config::{
    AlertConfig, AppConfig, AuthConfig, BillingConfig, HealthConfig, ServerConfig, SmtpConfig,
};
pub use database::DatabaseConfig;
pub use manager::ConfigManager;

use crate::error::{AppError, Result};

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.port == 0 {
        return Err(AppError::config(format!(
            "无效的服务器端口: {}",
            config.server.port
        )));
    }

    if config.database.url.is_empty() {
        return Err(AppError::config("数据库URL不能为空"));
    }

    if config.database.max_connections == 0 {
        return Err(AppError::config("数据库最大连接数必须大于0"));
    }

    crate::health::scheduler::parse_cron_pattern(&config.health.cron_pattern)?;

    if config.health.retention_days < 1 {
        return Err(AppError::config("健康检查记录保留天数必须大于等于1"));
    }

    if config.health.external_ping_url.is_empty() {
        return Err(AppError::config("外部连通性检查URL不能为空"));
    }

    if config.auth.jwt_secret.is_empty() {
        return Err(AppError::config("JWT密钥不能为空"));
    }

    Ok(())
}
