//! 邮件服务（SMTP）探针

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::{Duration, Instant};

use super::{HealthProbe, ProbeContext, classify, elapsed_ms};
use crate::config::SmtpConfig;
use crate::health::types::{HealthStatus, ProbeError, ProbeErrorKind, ProbeReport};

const OK_BELOW_MS: u64 = 2000;
const IMPLICIT_TLS_PORT: u16 = 465;

/// 根据配置构建异步 SMTP 传输
pub fn smtp_transport(smtp: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, ProbeError> {
    let (Some(host), Some(user), Some(password)) = (
        smtp.host.as_deref(),
        smtp.user.as_deref(),
        smtp.password.as_deref(),
    ) else {
        return Err(ProbeError::new(
            ProbeErrorKind::Unconfigured,
            "SMTP configuration incomplete",
        ));
    };
    if !smtp.is_complete() {
        return Err(ProbeError::new(
            ProbeErrorKind::Unconfigured,
            "SMTP configuration contains empty fields",
        ));
    }

    let builder = if smtp.port == IMPLICIT_TLS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
    };

    Ok(builder
        .port(smtp.port)
        .credentials(Credentials::new(user.to_string(), password.to_string()))
        .timeout(Some(Duration::from_secs(smtp.timeout_secs)))
        .build())
}

/// 构建纯文本邮件
pub fn plain_message(from: &str, to: &str, subject: &str, body: String) -> Result<Message, ProbeError> {
    let parse = |addr: &str| {
        addr.parse::<Mailbox>().map_err(|e| {
            ProbeError::new(ProbeErrorKind::Unconfigured, format!("invalid address: {e}"))
        })
    };

    Message::builder()
        .from(parse(from)?)
        .to(parse(to)?)
        .subject(subject)
        .body(body)
        .map_err(|e| ProbeError::new(ProbeErrorKind::Other, e.to_string()))
}

/// 测试邮件的（发件人, 收件人）；仅手动触发且收件人与发件人都已配置时返回
#[must_use]
pub fn test_email_target<'a>(
    ctx: &ProbeContext,
    recipient: Option<&'a str>,
    sender: Option<&'a str>,
) -> Option<(&'a str, &'a str)> {
    if !ctx.manual {
        return None;
    }
    let recipient = recipient.filter(|r| !r.is_empty())?;
    let sender = sender.filter(|s| !s.is_empty())?;
    Some((sender, recipient))
}

/// 测试 SMTP 连接；手动触发且配置了收件人时额外发送一封测试邮件
pub struct MailProbe {
    smtp: SmtpConfig,
    test_recipient: Option<String>,
}

impl MailProbe {
    #[must_use]
    pub const fn new(smtp: SmtpConfig, test_recipient: Option<String>) -> Self {
        Self {
            smtp,
            test_recipient,
        }
    }
}

#[async_trait]
impl HealthProbe for MailProbe {
    fn name(&self) -> &str {
        "mail"
    }

    async fn check(&self, ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        let transport = smtp_transport(&self.smtp)?;
        let start = Instant::now();

        if !transport.test_connection().await? {
            return Err(ProbeError::new(
                ProbeErrorKind::Smtp,
                "SMTP connection test rejected",
            ));
        }

        let mut test_email_sent = false;
        if let Some((sender, recipient)) =
            test_email_target(ctx, self.test_recipient.as_deref(), self.smtp.sender())
        {
            let message = plain_message(
                sender,
                recipient,
                "[Wonderful Books] Health check test email",
                format!(
                    "This is a test email sent by a manual health check at {}.",
                    chrono::Utc::now().to_rfc3339()
                ),
            )?;
            transport.send(message).await?;
            test_email_sent = true;
        }

        let elapsed = elapsed_ms(start);
        let status = classify(elapsed, OK_BELOW_MS, u64::MAX);
        let message = if status == HealthStatus::Ok {
            "SMTP connection verified".to_string()
        } else {
            format!("SMTP slow: {elapsed}ms")
        };

        Ok(ProbeReport::new(status, elapsed, message).with_meta("test_email_sent", test_email_sent))
    }
}
