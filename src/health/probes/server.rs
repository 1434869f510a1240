//! 应用自身的 `/ping` 探针

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{HealthProbe, ProbeContext, classify, timed_get};
use crate::health::types::{HealthStatus, ProbeError, ProbeReport};

const OK_BELOW_MS: u64 = 1000;

/// 请求本服务的 `/ping`，确认 HTTP 层可用
pub struct ServerProbe {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ServerProbe {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for ServerProbe {
    fn name(&self) -> &str {
        "server"
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        let url = format!("{}/ping", self.base_url.trim_end_matches('/'));
        let (response, elapsed) = timed_get(self.http.get(&url), self.timeout).await?;
        let code = response.status();

        if code != StatusCode::OK {
            return Ok(
                ProbeReport::new(HealthStatus::Fail, elapsed, format!("HTTP {}", code.as_u16()))
                    .with_meta("http_status", code.as_u16()),
            );
        }

        let status = classify(elapsed, OK_BELOW_MS, u64::MAX);
        let message = match status {
            HealthStatus::Ok => "server responding".to_string(),
            _ => format!("server slow: {elapsed}ms"),
        };
        Ok(ProbeReport::new(status, elapsed, message).with_meta("http_status", code.as_u16()))
    }
}
