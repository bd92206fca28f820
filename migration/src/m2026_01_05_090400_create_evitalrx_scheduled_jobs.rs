//! Migration to create the evitalrx_scheduled_jobs table.
//!
//! Each row is one scheduled unit of pharmacy sync work moving through
//! pending, running, completed and failed.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EvitalrxScheduledJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::JobType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::ErrorMessage)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::Config)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EvitalrxScheduledJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Picking due work
        manager
            .create_index(
                Index::create()
                    .name("idx_evitalrx_jobs_status_scheduled")
                    .table(EvitalrxScheduledJobs::Table)
                    .col(EvitalrxScheduledJobs::Status)
                    .col(EvitalrxScheduledJobs::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_evitalrx_jobs_type_scheduled")
                    .table(EvitalrxScheduledJobs::Table)
                    .col(EvitalrxScheduledJobs::JobType)
                    .col(EvitalrxScheduledJobs::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_evitalrx_jobs_status_scheduled")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_evitalrx_jobs_type_scheduled")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(EvitalrxScheduledJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EvitalrxScheduledJobs {
    Table,
    Id,
    JobType,
    Status,
    ScheduledAt,
    StartedAt,
    CompletedAt,
    RetryCount,
    MaxRetries,
    ErrorMessage,
    Config,
    CreatedAt,
    UpdatedAt,
}
