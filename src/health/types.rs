//! # 健康检查类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::AppError;

/// 运行记录执行中的占位状态
pub const RUN_STATUS_RUNNING: &str = "RUNNING";

/// 运行来源常量
pub struct RunSource;

impl RunSource {
    /// 定时调度触发
    pub const SCHEDULER: &'static str = "scheduler";
    /// 管理员手动触发
    pub const MANUAL: &'static str = "manual";
}

/// 健康状态，按严重程度排序：OK < WARN < FAIL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// 正常
    Ok,
    /// 性能下降
    Warn,
    /// 不可用
    Fail,
}

impl HealthStatus {
    /// 持久化使用的字符串
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }

    /// 取最严重的状态；空输入视为 OK
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        statuses.into_iter().max().unwrap_or(Self::Ok)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(Self::Ok),
            "WARN" => Ok(Self::Warn),
            "FAIL" => Ok(Self::Fail),
            other => Err(AppError::validation(format!("未知的健康状态: {other}"))),
        }
    }
}

/// 探针正常完成时的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub status: HealthStatus,
    pub duration_ms: u64,
    pub message: String,
    pub meta: Map<String, Value>,
}

impl ProbeReport {
    /// 创建报告，自动记录 `response_time_ms`
    pub fn new(status: HealthStatus, duration_ms: u64, message: impl Into<String>) -> Self {
        let mut meta = Map::new();
        meta.insert("response_time_ms".to_string(), Value::from(duration_ms));
        Self {
            status,
            duration_ms,
            message: message.into(),
            meta,
        }
    }

    /// 附加元数据
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

/// 探针失败类别，持久化到 `meta.error_kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    Network,
    Unconfigured,
    Database,
    Io,
    Mismatch,
    UnexpectedStatus,
    Smtp,
    Panic,
    Other,
}

impl ProbeErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Unconfigured => "unconfigured",
            Self::Database => "database",
            Self::Io => "io",
            Self::Mismatch => "mismatch",
            Self::UnexpectedStatus => "unexpected_status",
            Self::Smtp => "smtp",
            Self::Panic => "panic",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 探针执行失败
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub message: String,
}

impl ProbeError {
    pub fn new(kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProbeErrorKind::Timeout
        } else {
            ProbeErrorKind::Network
        };
        Self::new(kind, err.without_url().to_string())
    }
}

impl From<sea_orm::DbErr> for ProbeError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::new(ProbeErrorKind::Database, err.to_string())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        let kind = if err.kind() == std::io::ErrorKind::TimedOut {
            ProbeErrorKind::Timeout
        } else {
            ProbeErrorKind::Io
        };
        Self::new(kind, err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for ProbeError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        let kind = if err.is_timeout() {
            ProbeErrorKind::Timeout
        } else {
            ProbeErrorKind::Smtp
        };
        Self::new(kind, err.to_string())
    }
}

/// 单个探针在一次运行中的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckItem {
    pub name: String,
    pub status: HealthStatus,
    pub duration_ms: u64,
    pub message: String,
    pub meta: Value,
}

/// 一次完整运行的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: i32,
    pub overall_status: HealthStatus,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub items: Vec<CheckItem>,
}

impl RunResult {
    /// 状态为 FAIL 的探针名称
    #[must_use]
    pub fn failed_items(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.status == HealthStatus::Fail)
            .map(|item| item.name.clone())
            .collect()
    }
}

/// 运行摘要，存入 `health_check_runs.summary`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ok: u32,
    pub warn: u32,
    pub fail: u32,
    pub total: u32,
    pub total_duration_ms: u64,
    pub source: String,
}

impl RunSummary {
    /// 根据明细统计摘要
    #[must_use]
    pub fn from_items(items: &[CheckItem], total_duration_ms: u64, source: &str) -> Self {
        let mut summary = Self {
            total_duration_ms,
            source: source.to_string(),
            ..Self::default()
        };
        for item in items {
            match item.status {
                HealthStatus::Ok => summary.ok += 1,
                HealthStatus::Warn => summary.warn += 1,
                HealthStatus::Fail => summary.fail += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// 历史列表中的运行记录（不含明细）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i32,
    pub source: String,
    /// OK / WARN / FAIL，执行中为 RUNNING
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_duration_ms: Option<u64>,
    pub summary: Option<RunSummary>,
}

/// 单个探针的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStats {
    pub name: String,
    pub ok: u64,
    pub warn: u64,
    pub fail: u64,
    pub avg_duration_ms: f64,
    pub last_status: Option<HealthStatus>,
}

/// 时间窗口内的统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStats {
    pub days: u32,
    pub total_runs: u64,
    pub ok_runs: u64,
    pub warn_runs: u64,
    pub fail_runs: u64,
    pub uptime_percentage: f64,
    pub avg_duration_ms: f64,
    pub probes: Vec<ProbeStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aggregate_worst_wins() {
        use HealthStatus::{Fail, Ok, Warn};
        assert_eq!(HealthStatus::aggregate(Vec::<HealthStatus>::new()), Ok);
        assert_eq!(HealthStatus::aggregate([Ok, Ok]), Ok);
        assert_eq!(HealthStatus::aggregate([Ok, Warn, Ok]), Warn);
        assert_eq!(HealthStatus::aggregate([Warn, Fail, Ok]), Fail);
    }

    #[test]
    fn test_status_string_forms() {
        assert_eq!(HealthStatus::Warn.to_string(), "WARN");
        assert_eq!("fail".parse::<HealthStatus>().unwrap(), HealthStatus::Fail);
        assert!("RUNNING".parse::<HealthStatus>().is_err());
        assert_eq!(
            serde_json::to_value(HealthStatus::Ok).unwrap(),
            serde_json::json!("OK")
        );
    }

    #[test]
    fn test_report_records_response_time() {
        let report = ProbeReport::new(HealthStatus::Ok, 42, "fine").with_meta("rows", 1);
        assert_eq!(report.meta["response_time_ms"], 42);
        assert_eq!(report.meta["rows"], 1);
    }

    #[test]
    fn test_summary_counts() {
        let item = |name: &str, status| CheckItem {
            name: name.to_string(),
            status,
            duration_ms: 1,
            message: String::new(),
            meta: Value::Null,
        };
        let items = vec![
            item("server", HealthStatus::Ok),
            item("database", HealthStatus::Warn),
            item("billing", HealthStatus::Fail),
        ];
        let summary = RunSummary::from_items(&items, 120, RunSource::MANUAL);
        assert_eq!(
            summary,
            RunSummary {
                ok: 1,
                warn: 1,
                fail: 1,
                total: 3,
                total_duration_ms: 120,
                source: "manual".to_string(),
            }
        );
    }

    #[test]
    fn test_probe_error_display() {
        let err = ProbeError::new(ProbeErrorKind::UnexpectedStatus, "HTTP 503");
        assert_eq!(err.to_string(), "unexpected_status: HTTP 503");
    }
}
