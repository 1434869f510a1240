//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: super::DatabaseConfig,
    /// 健康检查配置
    pub health: HealthConfig,
    /// SMTP 邮件配置
    pub smtp: SmtpConfig,
    /// 支付服务配置
    pub billing: BillingConfig,
    /// 管理端认证配置
    pub auth: AuthConfig,
    /// 告警配置
    pub alerts: AlertConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 是否启用CORS
    pub enable_cors: bool,
    /// 允许的CORS源地址
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// 健康检查配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// 是否启用定时调度
    pub scheduler_enabled: bool,
    /// Cron 表达式（支持 5 段或 6/7 段格式）
    pub cron_pattern: String,
    /// 外部连通性检查地址
    pub external_ping_url: String,
    /// 存储探针的工作目录
    pub storage_path: String,
    /// 手动触发时发送测试邮件的收件人
    pub test_email_recipient: Option<String>,
    /// 运行记录保留天数
    pub retention_days: u32,
    /// 是否自动清理过期记录
    pub auto_cleanup: bool,
    /// 自动清理间隔（小时）
    pub cleanup_interval_hours: u64,
    /// 服务自检地址，默认使用本机监听端口
    pub self_base_url: Option<String>,
    /// 外部 HTTP 请求超时（秒）
    pub http_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            scheduler_enabled: true,
            cron_pattern: "0 */5 * * * *".to_string(),
            external_ping_url: "https://www.google.com".to_string(),
            storage_path: "./data/health".to_string(),
            test_email_recipient: None,
            retention_days: 30,
            auto_cleanup: true,
            cleanup_interval_hours: 24,
            self_base_url: None,
            http_timeout_secs: 3,
        }
    }
}

/// SMTP 邮件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// 服务器地址
    pub host: Option<String>,
    /// 服务器端口
    pub port: u16,
    /// 登录用户
    pub user: Option<String>,
    /// 登录密码
    pub password: Option<String>,
    /// 发件人地址
    pub from: Option<String>,
    /// 连接超时（秒）
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            user: None,
            password: None,
            from: None,
            timeout_secs: 5,
        }
    }
}

impl SmtpConfig {
    /// 主机、用户与密码均已配置
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.host, &self.user, &self.password]
            .iter()
            .all(|value| value.as_deref().is_some_and(|v| !v.is_empty()))
    }

    /// 发件人地址，未配置时回退到登录用户
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.user.as_deref())
    }
}

/// 支付服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Stripe 私钥
    pub secret_key: Option<String>,
    /// Stripe API 地址
    pub api_base: String,
    /// 请求超时（秒），需大于 WARN 阈值
    pub timeout_secs: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.stripe.com".to_string(),
            timeout_secs: 10,
        }
    }
}

/// 管理端认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT 签名密钥
    pub jwt_secret: String,
    /// 允许访问管理接口的角色
    pub admin_roles: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            admin_roles: vec!["admin".to_string(), "super_admin".to_string()],
        }
    }
}

/// 告警配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// 是否启用告警
    pub enabled: bool,
    /// 告警邮件收件人
    pub recipients: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recipients: Vec::new(),
        }
    }
}

impl AppConfig {
    /// 服务自检使用的基础地址
    #[must_use]
    pub fn self_base_url(&self) -> String {
        self.health.self_base_url.clone().unwrap_or_else(|| {
            let host = if self.server.host == "0.0.0.0" {
                "127.0.0.1"
            } else {
                self.server.host.as_str()
            };
            format!("http://{host}:{}", self.server.port)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8088

            [health]
            cron_pattern = "*/10 * * * *"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.health.cron_pattern, "*/10 * * * *");
        assert_eq!(config.health.retention_days, 30);
        assert_eq!(config.billing.api_base, "https://api.stripe.com");
        assert_eq!(config.billing.timeout_secs, 10);
    }

    #[test]
    fn test_self_base_url() {
        let mut config = AppConfig::default();
        assert_eq!(config.self_base_url(), "http://127.0.0.1:5000");

        config.health.self_base_url = Some("http://books.internal".to_string());
        assert_eq!(config.self_base_url(), "http://books.internal");
    }

    #[test]
    fn test_smtp_completeness() {
        let mut smtp = SmtpConfig::default();
        assert!(!smtp.is_complete());

        smtp.host = Some("smtp.example.com".to_string());
        smtp.user = Some("mailer@example.com".to_string());
        smtp.password = Some(String::new());
        assert!(!smtp.is_complete());

        smtp.password = Some("secret".to_string());
        assert!(smtp.is_complete());
        assert_eq!(smtp.sender(), Some("mailer@example.com"));
    }
}
