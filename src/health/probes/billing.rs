//! 支付服务（Stripe）探针

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{HealthProbe, ProbeContext, classify, timed_get};
use crate::health::types::{HealthStatus, ProbeError, ProbeErrorKind, ProbeReport};

const OK_BELOW_MS: u64 = 3000;

/// 使用只读的余额接口确认支付服务可用
pub struct BillingProbe {
    http: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
    timeout: Duration,
}

impl BillingProbe {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        api_base: String,
        secret_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            api_base,
            secret_key,
            timeout,
        }
    }
}

#[async_trait]
impl HealthProbe for BillingProbe {
    fn name(&self) -> &str {
        "billing"
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        let Some(secret_key) = self.secret_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(ProbeError::new(
                ProbeErrorKind::Unconfigured,
                "billing secret key not configured",
            ));
        };

        let url = format!("{}/v1/balance", self.api_base.trim_end_matches('/'));
        let request = self.http.get(&url).bearer_auth(secret_key);
        let (response, elapsed) = timed_get(request, self.timeout).await?;
        let code = response.status();

        if !code.is_success() {
            return Ok(ProbeReport::new(
                HealthStatus::Fail,
                elapsed,
                format!("billing API returned HTTP {}", code.as_u16()),
            )
            .with_meta("http_status", code.as_u16()));
        }

        let livemode = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("livemode").and_then(Value::as_bool));

        let status = classify(elapsed, OK_BELOW_MS, u64::MAX);
        let message = if status == HealthStatus::Ok {
            "billing API reachable".to_string()
        } else {
            format!("billing API slow: {elapsed}ms")
        };

        let mut report =
            ProbeReport::new(status, elapsed, message).with_meta("http_status", code.as_u16());
        if let Some(livemode) = livemode {
            report = report.with_meta("livemode", livemode);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BillingConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe(server: &MockServer, key: Option<&str>) -> BillingProbe {
        BillingProbe::new(
            reqwest::Client::new(),
            server.uri(),
            key.map(ToString::to_string),
            Duration::from_secs(BillingConfig::default().timeout_secs),
        )
    }

    #[tokio::test]
    async fn test_missing_key_is_unconfigured() {
        let server = MockServer::start().await;
        let err = probe(&server, None)
            .check(&ProbeContext::for_source("manual"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProbeErrorKind::Unconfigured);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_ok_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/balance"))
            .and(header("authorization", "Bearer sk_test_123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"object": "balance", "livemode": false})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let report = probe(&server, Some("sk_test_123"))
            .check(&ProbeContext::for_source("scheduler"))
            .await
            .unwrap();
        assert_eq!(report.status, HealthStatus::Ok);
        assert_eq!(report.meta["livemode"], false);
        assert!(!report.message.contains("sk_test_123"));
    }

    #[tokio::test]
    async fn test_unauthorized_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/balance"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let report = probe(&server, Some("sk_bad"))
            .check(&ProbeContext::for_source("scheduler"))
            .await
            .unwrap();
        assert_eq!(report.status, HealthStatus::Fail);
        assert_eq!(report.meta["http_status"], 401);
    }

    #[tokio::test]
    async fn test_slow_balance_is_warn() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/balance"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"object": "balance", "livemode": true}))
                    .set_delay(Duration::from_millis(3300)),
            )
            .mount(&server)
            .await;

        let report = probe(&server, Some("sk_test_123"))
            .check(&ProbeContext::for_source("scheduler"))
            .await
            .unwrap();
        assert_eq!(report.status, HealthStatus::Warn);
        assert!(report.duration_ms >= 3300);
        assert_eq!(report.meta["livemode"], true);
    }
}
