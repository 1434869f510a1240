use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HealthCheckRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HealthCheckRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckRuns::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckRuns::Status)
                            .string_len(16)
                            .not_null()
                            .default("RUNNING"),
                    )
                    .col(
                        ColumnDef::new(HealthCheckRuns::StartedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(HealthCheckRuns::FinishedAt).timestamp())
                    .col(ColumnDef::new(HealthCheckRuns::TotalDurationMs).big_integer())
                    .col(ColumnDef::new(HealthCheckRuns::Summary).text())
                    .to_owned(),
            )
            .await?;

        // 创建索引
        manager
            .create_index(
                Index::create()
                    .name("idx_health_check_runs_started_at")
                    .table(HealthCheckRuns::Table)
                    .col(HealthCheckRuns::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_health_check_runs_status")
                    .table(HealthCheckRuns::Table)
                    .col(HealthCheckRuns::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HealthCheckRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HealthCheckRuns {
    Table,
    Id,
    Source,
    Status,
    StartedAt,
    FinishedAt,
    TotalDurationMs,
    Summary,
}
