//! 外部网络连通性探针

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{HealthProbe, ProbeContext, classify, timed_get};
use crate::health::types::{HealthStatus, ProbeError, ProbeReport};

const OK_BELOW_MS: u64 = 2000;

/// 请求一个可配置的外部地址，确认出站网络可用
pub struct ExternalProbe {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ExternalProbe {
    #[must_use]
    pub fn new(http: reqwest::Client, url: String, timeout: Duration) -> Self {
        Self { http, url, timeout }
    }
}

#[async_trait]
impl HealthProbe for ExternalProbe {
    fn name(&self) -> &str {
        "external"
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        let (response, elapsed) = timed_get(self.http.get(&self.url), self.timeout).await?;
        let code = response.status();

        if code != StatusCode::OK {
            return Ok(
                ProbeReport::new(HealthStatus::Fail, elapsed, format!("HTTP {}", code.as_u16()))
                    .with_meta("http_status", code.as_u16()),
            );
        }

        let status = classify(elapsed, OK_BELOW_MS, u64::MAX);
        let message = if status == HealthStatus::Ok {
            "external connectivity ok".to_string()
        } else {
            format!("external connectivity slow: {elapsed}ms")
        };
        Ok(ProbeReport::new(status, elapsed, message).with_meta("http_status", code.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_external_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probe = ExternalProbe::new(reqwest::Client::new(), server.uri(), Duration::from_secs(3));
        let ctx = ProbeContext::for_source("scheduler");

        let first = probe.check(&ctx).await.unwrap();
        assert_eq!(first.status, HealthStatus::Ok);

        let second = probe.check(&ctx).await.unwrap();
        assert_eq!(second.status, HealthStatus::Fail);
        assert_eq!(second.meta["http_status"], 404);
    }

    #[tokio::test]
    async fn test_external_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let probe =
            ExternalProbe::new(reqwest::Client::new(), server.uri(), Duration::from_millis(100));
        let err = probe
            .check(&ProbeContext::for_source("scheduler"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::health::types::ProbeErrorKind::Timeout);
    }
}
