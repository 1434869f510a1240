use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HealthCheckItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HealthCheckItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckItems::RunId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckItems::CheckName)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckItems::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckItems::DurationMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HealthCheckItems::Message)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HealthCheckItems::Meta).text())
                    .col(
                        ColumnDef::new(HealthCheckItems::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_health_check_items_run_id")
                            .from(HealthCheckItems::Table, HealthCheckItems::RunId)
                            .to(HealthCheckRuns::Table, HealthCheckRuns::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建索引
        manager
            .create_index(
                Index::create()
                    .name("idx_health_check_items_run_id")
                    .table(HealthCheckItems::Table)
                    .col(HealthCheckItems::RunId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_health_check_items_check_name_created_at")
                    .table(HealthCheckItems::Table)
                    .col(HealthCheckItems::CheckName)
                    .col(HealthCheckItems::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HealthCheckItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HealthCheckItems {
    Table,
    Id,
    RunId,
    CheckName,
    Status,
    DurationMs,
    Message,
    Meta,
    CreatedAt,
}

#[derive(DeriveIden)]
enum HealthCheckRuns {
    Table,
    Id,
}
