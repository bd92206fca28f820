//! Migration to create the service_bookings table used for capacity checks.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceBookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceBookings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServiceBookings::ZoneId).uuid().not_null())
                    .col(ColumnDef::new(ServiceBookings::ServiceType).text().not_null())
                    .col(
                        ColumnDef::new(ServiceBookings::SlotStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceBookings::Status)
                            .text()
                            .not_null()
                            .default("confirmed"),
                    )
                    .col(
                        ColumnDef::new(ServiceBookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_bookings_zone_service_slot")
                    .table(ServiceBookings::Table)
                    .col(ServiceBookings::ZoneId)
                    .col(ServiceBookings::ServiceType)
                    .col(ServiceBookings::SlotStart)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceBookings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceBookings {
    Table,
    Id,
    ZoneId,
    ServiceType,
    SlotStart,
    Status,
    CreatedAt,
}
