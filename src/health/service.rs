//! # 健康检查服务
//!
//! 负责并发执行所有探针、持久化运行记录，以及历史、统计与清理查询

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use entity::{health_check_items, health_check_runs};
use futures::future::join_all;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;

use super::probes::{ProbeContext, ProbeRegistry, elapsed_ms, sanitize_message};
use super::types::{
    CheckItem, HealthStats, HealthStatus, ProbeError, ProbeErrorKind, ProbeReport, ProbeStats,
    RUN_STATUS_RUNNING, RunRecord, RunResult, RunSummary,
};
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};

/// 历史查询单页最大条数
pub const MAX_HISTORY_LIMIT: u64 = 100;

type ProbeOutcome =
    std::result::Result<(std::result::Result<ProbeReport, ProbeError>, u64), JoinError>;

/// 健康检查服务
pub struct HealthCheckService {
    db: DatabaseConnection,
    registry: ProbeRegistry,
}

impl HealthCheckService {
    /// 创建新的健康检查服务
    #[must_use]
    pub const fn new(db: DatabaseConnection, registry: ProbeRegistry) -> Self {
        Self { db, registry }
    }

    /// 已注册的探针
    #[must_use]
    pub const fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// 执行一次完整的健康检查并持久化结果
    ///
    /// 每个探针在独立的 tokio 任务中运行，panic 与错误都会被转换为 FAIL 明细，
    /// 因此明细数量始终等于注册的探针数量。
    pub async fn run_health_checks(&self, source: &str) -> Result<RunResult> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let run = health_check_runs::ActiveModel {
            source: Set(source.to_string()),
            status: Set(RUN_STATUS_RUNNING.to_string()),
            started_at: Set(started_at.naive_utc()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| crate::error!(Database, "health_run_insert_failed", e))?;
        let run_id = run.id;

        linfo!(
            "system",
            LogStage::HealthCheck,
            LogComponent::HealthChecker,
            "run_started",
            "健康检查开始",
            run_id = run_id,
            source = source,
            probes = self.registry.len()
        );

        let ctx = Arc::new(ProbeContext::for_source(source));
        let handles = self.registry.probes().iter().map(|probe| {
            let probe = Arc::clone(probe);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let start = Instant::now();
                let result = probe.check(&ctx).await;
                (result, elapsed_ms(start))
            })
        });
        let outcomes = join_all(handles).await;

        let items: Vec<CheckItem> = self
            .registry
            .names()
            .into_iter()
            .zip(outcomes)
            .map(|(name, outcome)| settle(name, outcome, elapsed_ms(clock)))
            .collect();

        let overall_status = HealthStatus::aggregate(items.iter().map(|item| item.status));
        let total_duration_ms = elapsed_ms(clock);
        let finished_at = Utc::now();
        let summary = RunSummary::from_items(&items, total_duration_ms, source);

        if let Err(e) = self
            .persist_outcome(run, &items, overall_status, finished_at, &summary)
            .await
        {
            self.mark_run_failed(run_id, finished_at).await;
            return Err(e);
        }

        linfo!(
            "system",
            LogStage::HealthCheck,
            LogComponent::HealthChecker,
            "run_finished",
            "健康检查完成",
            run_id = run_id,
            overall_status = %overall_status,
            ok = summary.ok,
            warn = summary.warn,
            fail = summary.fail,
            total_duration_ms = total_duration_ms
        );

        Ok(RunResult {
            run_id,
            overall_status,
            source: source.to_string(),
            started_at,
            finished_at,
            total_duration_ms,
            items,
        })
    }

    /// 写入全部明细后再更新运行记录
    async fn persist_outcome(
        &self,
        run: health_check_runs::Model,
        items: &[CheckItem],
        overall_status: HealthStatus,
        finished_at: DateTime<Utc>,
        summary: &RunSummary,
    ) -> Result<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| crate::error!(Database, "health_run_txn_begin_failed", e))?;

        if !items.is_empty() {
            let rows = items.iter().map(|item| health_check_items::ActiveModel {
                run_id: Set(run.id),
                check_name: Set(item.name.clone()),
                status: Set(item.status.as_str().to_string()),
                duration_ms: Set(to_i64(item.duration_ms)),
                message: Set(item.message.clone()),
                meta: Set(Some(item.meta.to_string())),
                created_at: Set(finished_at.naive_utc()),
                ..Default::default()
            });
            health_check_items::Entity::insert_many(rows)
                .exec(&txn)
                .await
                .map_err(|e| crate::error!(Database, "health_items_insert_failed", e))?;
        }

        let mut active: health_check_runs::ActiveModel = run.into();
        active.status = Set(overall_status.as_str().to_string());
        active.finished_at = Set(Some(finished_at.naive_utc()));
        active.total_duration_ms = Set(Some(to_i64(summary.total_duration_ms)));
        active.summary = Set(Some(serde_json::to_string(summary)?));
        active
            .update(&txn)
            .await
            .map_err(|e| crate::error!(Database, "health_run_update_failed", e))?;

        txn.commit()
            .await
            .map_err(|e| crate::error!(Database, "health_run_commit_failed", e))?;
        Ok(())
    }

    /// 持久化失败后尽力把运行标记为 FAIL，避免遗留 RUNNING 记录
    async fn mark_run_failed(&self, run_id: i32, finished_at: DateTime<Utc>) {
        let result = health_check_runs::Entity::update_many()
            .col_expr(
                health_check_runs::Column::Status,
                Expr::value(HealthStatus::Fail.as_str()),
            )
            .col_expr(
                health_check_runs::Column::FinishedAt,
                Expr::value(finished_at.naive_utc()),
            )
            .filter(health_check_runs::Column::Id.eq(run_id))
            .exec(&self.db)
            .await;

        if let Err(e) = result {
            lerror!(
                "system",
                LogStage::Db,
                LogComponent::HealthChecker,
                "mark_run_failed",
                "无法将运行标记为失败",
                run_id = run_id,
                error = %e
            );
        }
    }

    /// 最近一次已完成的运行
    pub async fn latest_run(&self) -> Result<Option<RunResult>> {
        let run = health_check_runs::Entity::find()
            .filter(health_check_runs::Column::Status.ne(RUN_STATUS_RUNNING))
            .order_by_desc(health_check_runs::Column::StartedAt)
            .order_by_desc(health_check_runs::Column::Id)
            .one(&self.db)
            .await?;

        match run {
            Some(run) => self.load_run_result(run).await,
            None => Ok(None),
        }
    }

    /// 最近一次已完成运行的整体状态
    pub async fn latest_status(&self) -> Result<Option<HealthStatus>> {
        let run = health_check_runs::Entity::find()
            .filter(health_check_runs::Column::Status.ne(RUN_STATUS_RUNNING))
            .order_by_desc(health_check_runs::Column::StartedAt)
            .order_by_desc(health_check_runs::Column::Id)
            .one(&self.db)
            .await?;

        run.map(|run| run.status.parse()).transpose()
    }

    /// 分页查询运行历史，`page` 从 1 开始
    pub async fn history(
        &self,
        page: u64,
        limit: u64,
        status_filter: Option<HealthStatus>,
    ) -> Result<(Vec<RunRecord>, u64)> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let page = page.max(1);

        let mut query = health_check_runs::Entity::find();
        if let Some(status) = status_filter {
            query = query.filter(health_check_runs::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(health_check_runs::Column::StartedAt)
            .order_by_desc(health_check_runs::Column::Id)
            .paginate(&self.db, limit);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| crate::error!(Database, "health_history_count_failed", e))?;
        let runs = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| crate::error!(Database, "health_history_fetch_failed", e))?;

        Ok((runs.into_iter().map(to_run_record).collect(), total))
    }

    /// 查询单次运行详情；执行中的运行返回 `None`
    pub async fn run_detail(&self, run_id: i32) -> Result<Option<RunResult>> {
        let run = health_check_runs::Entity::find_by_id(run_id)
            .one(&self.db)
            .await?;

        match run {
            Some(run) if run.status != RUN_STATUS_RUNNING => self.load_run_result(run).await,
            _ => Ok(None),
        }
    }

    /// 统计最近 `days` 天的运行情况
    pub async fn stats(&self, days: u32) -> Result<HealthStats> {
        let cutoff = (Utc::now() - ChronoDuration::days(i64::from(days))).naive_utc();

        let runs = health_check_runs::Entity::find()
            .filter(health_check_runs::Column::StartedAt.gte(cutoff))
            .filter(health_check_runs::Column::Status.ne(RUN_STATUS_RUNNING))
            .all(&self.db)
            .await
            .map_err(|e| crate::error!(Database, "health_stats_runs_failed", e))?;

        let mut run_counts: HashMap<HealthStatus, u64> = HashMap::new();
        let mut run_duration_total = 0_i64;
        for run in &runs {
            if let Ok(status) = run.status.parse::<HealthStatus>() {
                *run_counts.entry(status).or_default() += 1;
            }
            run_duration_total += run.total_duration_ms.unwrap_or(0);
        }

        let items = health_check_items::Entity::find()
            .filter(health_check_items::Column::CreatedAt.gte(cutoff))
            .order_by_asc(health_check_items::Column::CreatedAt)
            .order_by_asc(health_check_items::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| crate::error!(Database, "health_stats_items_failed", e))?;

        let probes = probe_breakdown(&self.registry.names(), &items);

        let total_runs = runs.len() as u64;
        let ok_runs = run_counts.get(&HealthStatus::Ok).copied().unwrap_or(0);
        let warn_runs = run_counts.get(&HealthStatus::Warn).copied().unwrap_or(0);
        let fail_runs = run_counts.get(&HealthStatus::Fail).copied().unwrap_or(0);

        Ok(HealthStats {
            days,
            total_runs,
            ok_runs,
            warn_runs,
            fail_runs,
            uptime_percentage: percentage(ok_runs + warn_runs, total_runs),
            avg_duration_ms: average(run_duration_total, total_runs),
            probes,
        })
    }

    /// 删除早于保留期的运行及其明细，返回删除的运行数
    pub async fn cleanup(&self, retention_days: u32) -> Result<u64> {
        crate::ensure!(retention_days >= 1, Validation, "retention_days 必须大于等于1");

        let cutoff = (Utc::now() - ChronoDuration::days(i64::from(retention_days))).naive_utc();
        let txn = self.db.begin().await?;

        let stale_ids: Vec<i32> = health_check_runs::Entity::find()
            .select_only()
            .column(health_check_runs::Column::Id)
            .filter(health_check_runs::Column::StartedAt.lt(cutoff))
            .into_tuple()
            .all(&txn)
            .await?;

        if stale_ids.is_empty() {
            txn.commit().await?;
            return Ok(0);
        }

        health_check_items::Entity::delete_many()
            .filter(health_check_items::Column::RunId.is_in(stale_ids.clone()))
            .exec(&txn)
            .await?;
        let deleted = health_check_runs::Entity::delete_many()
            .filter(health_check_runs::Column::Id.is_in(stale_ids))
            .exec(&txn)
            .await?;

        txn.commit()
            .await
            .map_err(|e| crate::error!(Database, "health_cleanup_commit_failed", e))?;

        linfo!(
            "system",
            LogStage::BackgroundTask,
            LogComponent::HealthChecker,
            "cleanup",
            "已清理过期健康检查记录",
            deleted = deleted.rows_affected,
            retention_days = retention_days
        );

        Ok(deleted.rows_affected)
    }

    async fn load_run_result(&self, run: health_check_runs::Model) -> Result<Option<RunResult>> {
        let Ok(overall_status) = run.status.parse::<HealthStatus>() else {
            return Ok(None);
        };

        let items = health_check_items::Entity::find()
            .filter(health_check_items::Column::RunId.eq(run.id))
            .order_by_asc(health_check_items::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_check_item)
            .collect();

        let started_at = run.started_at.and_utc();
        Ok(Some(RunResult {
            run_id: run.id,
            overall_status,
            source: run.source,
            started_at,
            finished_at: run.finished_at.map_or(started_at, |t| t.and_utc()),
            total_duration_ms: run.total_duration_ms.map_or(0, to_u64),
            items,
        }))
    }
}

/// 将探针任务的结果转换为明细
fn settle(name: String, outcome: ProbeOutcome, fallback_ms: u64) -> CheckItem {
    match outcome {
        Ok((Ok(report), _)) => {
            ldebug!(
                "system",
                LogStage::HealthCheck,
                LogComponent::Probe,
                "probe_settled",
                "探针完成",
                probe = %name,
                status = %report.status,
                duration_ms = report.duration_ms
            );
            CheckItem {
                name,
                status: report.status,
                duration_ms: report.duration_ms,
                message: sanitize_message(&report.message),
                meta: Value::Object(report.meta),
            }
        }
        Ok((Err(error), elapsed)) => failed_item(name, error.kind, &error.message, elapsed),
        Err(join_error) => {
            let detail = if join_error.is_panic() {
                "probe task panicked"
            } else {
                "probe task cancelled"
            };
            failed_item(name, ProbeErrorKind::Panic, detail, fallback_ms)
        }
    }
}

fn failed_item(name: String, kind: ProbeErrorKind, detail: &str, duration_ms: u64) -> CheckItem {
    lwarn!(
        "system",
        LogStage::HealthCheck,
        LogComponent::Probe,
        "probe_failed",
        "探针执行失败",
        probe = %name,
        error_kind = kind.as_str(),
        detail = %sanitize_message(detail)
    );
    CheckItem {
        message: format!("{name} check failed: {kind}"),
        name,
        status: HealthStatus::Fail,
        duration_ms,
        meta: json!({ "error_kind": kind.as_str() }),
    }
}

fn probe_breakdown(registered: &[String], items: &[health_check_items::Model]) -> Vec<ProbeStats> {
    let mut order: Vec<String> = registered.to_vec();
    let mut stats: HashMap<String, (ProbeStats, i64)> = HashMap::new();

    for item in items {
        if !order.contains(&item.check_name) {
            order.push(item.check_name.clone());
        }
        let (entry, duration_total) = stats.entry(item.check_name.clone()).or_insert_with(|| {
            (
                ProbeStats {
                    name: item.check_name.clone(),
                    ..ProbeStats::default()
                },
                0,
            )
        });
        if let Ok(status) = item.status.parse::<HealthStatus>() {
            match status {
                HealthStatus::Ok => entry.ok += 1,
                HealthStatus::Warn => entry.warn += 1,
                HealthStatus::Fail => entry.fail += 1,
            }
            entry.last_status = Some(status);
        }
        *duration_total += item.duration_ms;
    }

    order
        .into_iter()
        .filter_map(|name| stats.remove(&name))
        .map(|(mut entry, duration_total)| {
            entry.avg_duration_ms = average(duration_total, entry.ok + entry.warn + entry.fail);
            entry
        })
        .collect()
}

fn to_run_record(run: health_check_runs::Model) -> RunRecord {
    RunRecord {
        id: run.id,
        source: run.source,
        status: run.status,
        started_at: run.started_at.and_utc(),
        finished_at: run.finished_at.map(|t: NaiveDateTime| t.and_utc()),
        total_duration_ms: run.total_duration_ms.map(to_u64),
        summary: run
            .summary
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok()),
    }
}

fn to_check_item(item: health_check_items::Model) -> CheckItem {
    CheckItem {
        status: item.status.parse().unwrap_or(HealthStatus::Fail),
        name: item.check_name,
        duration_ms: to_u64(item.duration_ms),
        message: item.message,
        meta: item
            .meta
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 10_000.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn average(sum: i64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    ((sum as f64 / count as f64) * 100.0).round() / 100.0
}
