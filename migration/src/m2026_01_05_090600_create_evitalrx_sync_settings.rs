//! Migration to create the evitalrx_sync_settings table.
//!
//! Holds a single row (id = 1) that the scheduler re-reads on every tick.
//! The row itself is created lazily from process configuration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EvitalrxSyncSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::IntervalMinutes)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::JobTypes)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::RetryDelaySeconds)
                            .integer()
                            .not_null()
                            .default(300),
                    )
                    .col(
                        ColumnDef::new(EvitalrxSyncSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EvitalrxSyncSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EvitalrxSyncSettings {
    Table,
    Id,
    Enabled,
    IntervalMinutes,
    JobTypes,
    MaxRetries,
    RetryDelaySeconds,
    UpdatedAt,
}
