//! 数据库连通性探针

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement, TransactionTrait};
use std::time::Instant;

use super::{HealthProbe, ProbeContext, classify, elapsed_ms};
use crate::health::types::{HealthStatus, ProbeError, ProbeReport};

const OK_BELOW_MS: u64 = 100;
const WARN_BELOW_MS: u64 = 1000;

/// 执行 `SELECT 1` 并开启一个立即回滚的事务
pub struct DatabaseProbe {
    db: DatabaseConnection,
}

impl DatabaseProbe {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn select_one(&self) -> Statement {
        Statement::from_string(self.db.get_database_backend(), "SELECT 1".to_owned())
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        let start = Instant::now();

        self.db.execute(self.select_one()).await?;

        let txn = self.db.begin().await?;
        txn.execute(self.select_one()).await?;
        txn.rollback().await?;

        let elapsed = elapsed_ms(start);
        let status = classify(elapsed, OK_BELOW_MS, WARN_BELOW_MS);
        let message = match status {
            HealthStatus::Ok => "database responding".to_string(),
            HealthStatus::Warn => format!("database slow: {elapsed}ms"),
            HealthStatus::Fail => format!("database too slow: {elapsed}ms"),
        };

        Ok(ProbeReport::new(status, elapsed, message).with_meta("transaction_test", true))
    }
}
