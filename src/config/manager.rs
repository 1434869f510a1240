//! # 配置管理器
//!
//! 统一的配置加载入口：TOML 文件 + `WB_` 前缀环境变量覆盖

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::AppConfig;
use crate::error::{AppError, Result};

/// 环境变量前缀
const ENV_PREFIX: &str = "WB_";

/// 配置管理器
pub struct ConfigManager {
    /// 当前配置
    config: Arc<RwLock<AppConfig>>,
    /// 配置文件路径
    config_path: PathBuf,
}

impl ConfigManager {
    /// 创建配置管理器
    ///
    /// 路径优先级：显式参数 > `WB_CONFIG_PATH` > `config/config.{RUST_ENV}.toml`
    pub fn new(explicit_path: Option<PathBuf>) -> Result<Self> {
        match explicit_path.or_else(|| env::var("WB_CONFIG_PATH").ok().map(PathBuf::from)) {
            Some(path) => Self::from_file(path),
            None => {
                let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
                let default_path = PathBuf::from(format!("config/config.{env}.toml"));
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    warn!(
                        "默认配置文件不存在: {}，使用内置默认配置",
                        default_path.display()
                    );
                    Self::from_config(AppConfig::default(), default_path)
                }
            }
        }
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = Self::load_config_file(config_path)?;
        Self::from_config(config, config_path.to_path_buf())
    }

    /// 从已有配置创建（应用环境变量覆盖并验证）
    fn from_config(mut config: AppConfig, config_path: PathBuf) -> Result<Self> {
        let env_overrides = Self::build_env_overrides();
        Self::apply_env_overrides(&mut config, &env_overrides)?;
        super::validate_config(&config)?;

        info!("配置管理器初始化完成");
        info!("- 配置文件: {}", config_path.display());
        info!("- 环境变量覆盖: {} 个", env_overrides.len());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// 获取当前配置
    pub async fn get_config(&self) -> AppConfig {
        (*self.config.read().await).clone()
    }

    /// 配置文件路径
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(AppError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        let config: AppConfig = toml::from_str(&config_content).map_err(|e| {
            AppError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}", path.display()),
                e,
            )
        })?;

        Ok(config)
    }

    /// 构建环境变量覆盖映射
    fn build_env_overrides() -> HashMap<String, String> {
        let mut overrides = HashMap::new();

        for (key, value) in env::vars() {
            if key == "WB_CONFIG_PATH" {
                continue;
            }
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                // 例如: WB_HEALTH_CRON_PATTERN -> health.cron.pattern
                let config_path = config_key.to_lowercase().replace('_', ".");
                overrides.insert(config_path, value);
            }
        }

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (path, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                path,
                if path.contains("password") || path.contains("key") || path.contains("secret")
                {
                    "***"
                } else {
                    value
                }
            );

            Self::apply_override_to_config(config, path, value)?;
        }
        Ok(())
    }

    /// 将单个覆盖项应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        let optional = || {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };

        match parts.as_slice() {
            ["server", "host"] => config.server.host = value.to_string(),
            ["server", "port"] => config.server.port = parse_value(path, value)?,
            ["database", "url"] => config.database.url = value.to_string(),
            ["database", "max", "connections"] => {
                config.database.max_connections = parse_value(path, value)?;
            }
            ["health", "scheduler", "enabled"] => {
                config.health.scheduler_enabled = parse_value(path, value)?;
            }
            ["health", "cron", "pattern"] => config.health.cron_pattern = value.to_string(),
            ["health", "external", "ping", "url"] => {
                config.health.external_ping_url = value.to_string();
            }
            ["health", "storage", "path"] => config.health.storage_path = value.to_string(),
            ["health", "test", "email", "recipient"] => {
                config.health.test_email_recipient = optional();
            }
            ["health", "retention", "days"] => {
                config.health.retention_days = parse_value(path, value)?;
            }
            ["health", "auto", "cleanup"] => {
                config.health.auto_cleanup = parse_value(path, value)?;
            }
            ["health", "self", "base", "url"] => config.health.self_base_url = optional(),
            ["smtp", "host"] => config.smtp.host = optional(),
            ["smtp", "port"] => config.smtp.port = parse_value(path, value)?,
            ["smtp", "user"] => config.smtp.user = optional(),
            ["smtp", "password"] => config.smtp.password = optional(),
            ["smtp", "from"] => config.smtp.from = optional(),
            ["billing", "secret", "key"] => config.billing.secret_key = optional(),
            ["billing", "api", "base"] => config.billing.api_base = value.to_string(),
            ["billing", "timeout", "secs"] => {
                config.billing.timeout_secs = parse_value(path, value)?;
            }
            ["auth", "jwt", "secret"] => config.auth.jwt_secret = value.to_string(),
            ["alerts", "enabled"] => config.alerts.enabled = parse_value(path, value)?,
            ["alerts", "recipients"] => {
                config.alerts.recipients = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            _ => {
                warn!("未知的配置路径，忽略环境变量覆盖: {}", path);
            }
        }

        Ok(())
    }
}

fn parse_value<T>(path: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| AppError::config_with_source(format!("无效的配置值 {path}: {value}"), e))
}
