//! # 健康告警
//!
//! 运行结束后在独立任务中发送告警，发送失败只记录日志

use async_trait::async_trait;
use lettre::AsyncTransport;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::probes::{plain_message, smtp_transport};
use super::types::{HealthStatus, RunResult};
use crate::config::{AlertConfig, SmtpConfig};
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};

const SUBJECT_PREFIX: &str = "[Wonderful Books] Health";

/// FAIL 与 OK 会触发告警，WARN 不会
#[must_use]
pub const fn should_alert(status: HealthStatus) -> bool {
    matches!(status, HealthStatus::Fail | HealthStatus::Ok)
}

/// 告警内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub overall_status: HealthStatus,
    pub failed_items: Vec<String>,
}

impl AlertMessage {
    /// 根据运行结果生成告警内容
    #[must_use]
    pub fn from_run(run: &RunResult) -> Self {
        let failed_items = run.failed_items();
        let subject = if failed_items.is_empty() {
            format!("{SUBJECT_PREFIX} {}", run.overall_status)
        } else {
            format!(
                "{SUBJECT_PREFIX} {}: {}",
                run.overall_status,
                failed_items.join(", ")
            )
        };

        let mut body = format!(
            "Health check run #{} ({}) finished with status {} in {}ms.\n\n",
            run.run_id, run.source, run.overall_status, run.total_duration_ms
        );
        for item in &run.items {
            body.push_str(&format!(
                "- {}: {} ({}ms) {}\n",
                item.name, item.status, item.duration_ms, item.message
            ));
        }
        body.push_str(&format!("\nFinished at {}\n", run.finished_at.to_rfc3339()));

        Self {
            subject,
            body,
            overall_status: run.overall_status,
            failed_items,
        }
    }
}

/// 告警通道
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// 通道名称
    fn name(&self) -> &'static str;

    /// 发送告警
    async fn send(&self, message: &AlertMessage) -> Result<()>;
}

/// 以结构化日志输出告警
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertChannel;

#[async_trait]
impl AlertChannel for LogAlertChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &AlertMessage) -> Result<()> {
        if message.overall_status == HealthStatus::Fail {
            lerror!(
                "system",
                LogStage::Alerting,
                LogComponent::Alert,
                "health_alert",
                &message.subject,
                failed_items = ?message.failed_items
            );
        } else {
            linfo!(
                "system",
                LogStage::Alerting,
                LogComponent::Alert,
                "health_alert",
                &message.subject
            );
        }
        Ok(())
    }
}

/// 通过 SMTP 发送告警邮件
pub struct EmailAlertChannel {
    smtp: SmtpConfig,
    recipients: Vec<String>,
}

impl EmailAlertChannel {
    #[must_use]
    pub const fn new(smtp: SmtpConfig, recipients: Vec<String>) -> Self {
        Self { smtp, recipients }
    }
}

#[async_trait]
impl AlertChannel for EmailAlertChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let sender = self
            .smtp
            .sender()
            .ok_or_else(|| crate::error!(Config, "SMTP sender not configured"))?;
        let transport = smtp_transport(&self.smtp)
            .map_err(|e| crate::error!(Config, "SMTP transport unavailable", e))?;

        for recipient in &self.recipients {
            let email = plain_message(sender, recipient, &message.subject, message.body.clone())
                .map_err(|e| crate::error!(Validation, "alert email build failed", e))?;
            transport
                .send(email)
                .await
                .map_err(|e| crate::error!(Network, "alert email send failed", e))?;
        }
        Ok(())
    }
}

/// 告警分发器
#[derive(Clone)]
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn AlertChannel>>,
    enabled: bool,
}

impl AlertDispatcher {
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn AlertChannel>>, enabled: bool) -> Self {
        Self { channels, enabled }
    }

    /// 日志通道始终启用；配置了收件人且 SMTP 完整时启用邮件通道
    #[must_use]
    pub fn from_config(alerts: &AlertConfig, smtp: &SmtpConfig) -> Self {
        let mut channels: Vec<Arc<dyn AlertChannel>> = vec![Arc::new(LogAlertChannel)];
        if !alerts.recipients.is_empty() && smtp.is_complete() {
            channels.push(Arc::new(EmailAlertChannel::new(
                smtp.clone(),
                alerts.recipients.clone(),
            )));
        }
        Self::new(channels, alerts.enabled)
    }

    /// 已启用通道名称
    #[must_use]
    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// 在独立任务中分发告警，调用方无需等待返回的句柄
    pub fn dispatch(&self, run: &RunResult) -> JoinHandle<()> {
        let channels = self.channels.clone();
        let enabled = self.enabled;
        let run_id = run.run_id;
        let status = run.overall_status;
        let message = AlertMessage::from_run(run);

        tokio::spawn(async move {
            if !enabled || !should_alert(status) {
                ldebug!(
                    "system",
                    LogStage::Alerting,
                    LogComponent::Alert,
                    "alert_skipped",
                    "本次运行不发送告警",
                    run_id = run_id,
                    status = %status,
                    enabled = enabled
                );
                return;
            }

            for channel in channels {
                if let Err(e) = channel.send(&message).await {
                    lwarn!(
                        "system",
                        LogStage::Alerting,
                        LogComponent::Alert,
                        "alert_send_failed",
                        "告警发送失败",
                        run_id = run_id,
                        channel = channel.name(),
                        error = %e
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::types::CheckItem;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn run_with(statuses: &[(&str, HealthStatus)]) -> RunResult {
        let items: Vec<CheckItem> = statuses
            .iter()
            .map(|(name, status)| CheckItem {
                name: (*name).to_string(),
                status: *status,
                duration_ms: 5,
                message: format!("{name} {status}"),
                meta: Value::Null,
            })
            .collect();
        RunResult {
            run_id: 7,
            overall_status: HealthStatus::aggregate(items.iter().map(|i| i.status)),
            source: "scheduler".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total_duration_ms: 12,
            items,
        }
    }

    #[test]
    fn test_should_alert_rule() {
        assert!(should_alert(HealthStatus::Fail));
        assert!(should_alert(HealthStatus::Ok));
        assert!(!should_alert(HealthStatus::Warn));
    }

    #[test]
    fn test_subject_lists_failed_items() {
        let run = run_with(&[
            ("server", HealthStatus::Ok),
            ("database", HealthStatus::Fail),
            ("billing", HealthStatus::Fail),
        ]);
        let message = AlertMessage::from_run(&run);
        assert_eq!(message.subject, "[Wonderful Books] Health FAIL: database, billing");
        assert_eq!(message.failed_items, vec!["database", "billing"]);
        assert!(message.body.contains("- database: FAIL"));

        let ok = AlertMessage::from_run(&run_with(&[("server", HealthStatus::Ok)]));
        assert_eq!(ok.subject, "[Wonderful Books] Health OK");
    }

    #[tokio::test]
    async fn test_dispatch_fail_sends_to_every_channel() {
        let mut failing = MockAlertChannel::new();
        failing.expect_name().return_const("failing");
        failing
            .expect_send()
            .times(1)
            .returning(|_| Err(crate::error!(Network, "smtp down")));

        let mut recording = MockAlertChannel::new();
        recording.expect_name().return_const("recording");
        recording
            .expect_send()
            .withf(|m| m.overall_status == HealthStatus::Fail)
            .times(1)
            .returning(|_| Ok(()));

        let dispatcher = AlertDispatcher::new(vec![Arc::new(failing), Arc::new(recording)], true);
        let run = run_with(&[("database", HealthStatus::Fail)]);
        dispatcher.dispatch(&run).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_warn_is_silent() {
        let mut channel = MockAlertChannel::new();
        channel.expect_name().return_const("mock");
        channel.expect_send().never();

        let dispatcher = AlertDispatcher::new(vec![Arc::new(channel)], true);
        let run = run_with(&[("server", HealthStatus::Ok), ("database", HealthStatus::Warn)]);
        dispatcher.dispatch(&run).await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_is_silent() {
        let mut channel = MockAlertChannel::new();
        channel.expect_name().return_const("mock");
        channel.expect_send().never();

        let dispatcher = AlertDispatcher::new(vec![Arc::new(channel)], false);
        dispatcher
            .dispatch(&run_with(&[("server", HealthStatus::Fail)]))
            .await
            .unwrap();
    }

    #[test]
    fn test_from_config_channels() {
        let alerts = AlertConfig {
            enabled: true,
            recipients: vec!["ops@example.com".to_string()],
        };
        let incomplete = AlertDispatcher::from_config(&alerts, &SmtpConfig::default());
        assert_eq!(incomplete.channel_names(), vec!["log"]);

        let smtp = SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            user: Some("mailer@example.com".to_string()),
            password: Some("secret".to_string()),
            ..SmtpConfig::default()
        };
        let full = AlertDispatcher::from_config(&alerts, &smtp);
        assert_eq!(full.channel_names(), vec!["log", "email"]);
    }
}
