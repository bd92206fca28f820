//! Migration to create the evitalrx_sync_logs table holding per-run outcomes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EvitalrxSyncLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EvitalrxSyncLogs::JobId).uuid().null())
                    .col(ColumnDef::new(EvitalrxSyncLogs::SyncType).text().not_null())
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::Status)
                            .text()
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::TotalRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::ProcessedRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::FailedRecords)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(EvitalrxSyncLogs::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncLogs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_evitalrx_sync_logs_type_status_completed")
                    .table(EvitalrxSyncLogs::Table)
                    .col(EvitalrxSyncLogs::SyncType)
                    .col(EvitalrxSyncLogs::Status)
                    .col(EvitalrxSyncLogs::CompletedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_evitalrx_sync_logs_type_status_completed")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(EvitalrxSyncLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EvitalrxSyncLogs {
    Table,
    Id,
    JobId,
    SyncType,
    Status,
    TotalRecords,
    ProcessedRecords,
    FailedRecords,
    ErrorMessage,
    StartedAt,
    CompletedAt,
}
