//! Migration to create the zone_service_configs table.
//!
//! One row per (zone, service type) pair. The composite unique index is what
//! makes admin upserts last-write-wins instead of producing duplicates.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ZoneServiceConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ZoneServiceConfigs::ZoneId).uuid().not_null())
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::ServiceType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::IsEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::DeliveryFee)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::MinOrderAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::MaxOrderAmount)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::PeakHourMultiplier)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::DistanceBasedPricing)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::EstimatedDeliveryTime)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::OperatingHours)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::CapacityPerHour)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::StaffRequired)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::EquipmentRequired)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::AdvanceBookingDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::EmergencyAvailable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::PrescriptionRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ZoneServiceConfigs::AgeMin).integer().null())
                    .col(ColumnDef::new(ZoneServiceConfigs::AgeMax).integer().null())
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::SpecialRequirements)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::CustomConfig)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ZoneServiceConfigs::UpdatedAt)
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
                    .name("idx_zone_service_configs_zone_service")
                    .table(ZoneServiceConfigs::Table)
                    .col(ZoneServiceConfigs::ZoneId)
                    .col(ZoneServiceConfigs::ServiceType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_zone_service_configs_zone_service")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ZoneServiceConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ZoneServiceConfigs {
    Table,
    Id,
    ZoneId,
    ServiceType,
    IsEnabled,
    DeliveryFee,
    MinOrderAmount,
    MaxOrderAmount,
    PeakHourMultiplier,
    DistanceBasedPricing,
    EstimatedDeliveryTime,
    OperatingHours,
    CapacityPerHour,
    StaffRequired,
    EquipmentRequired,
    AdvanceBookingDays,
    EmergencyAvailable,
    PrescriptionRequired,
    AgeMin,
    AgeMax,
    SpecialRequirements,
    CustomConfig,
    CreatedAt,
    UpdatedAt,
}
