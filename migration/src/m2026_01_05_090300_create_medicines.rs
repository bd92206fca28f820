//! Migration to create the medicines table.
//!
//! Rows sourced from the external pharmacy carry `external_product_id`, which
//! is unique so catalogue syncs can upsert idempotently.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Medicines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Medicines::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Medicines::ExternalProductId).text().null())
                    .col(ColumnDef::new(Medicines::Name).text().not_null())
                    .col(ColumnDef::new(Medicines::Manufacturer).text().null())
                    .col(ColumnDef::new(Medicines::Category).text().null())
                    .col(ColumnDef::new(Medicines::Composition).text().null())
                    .col(ColumnDef::new(Medicines::PackSize).text().null())
                    .col(
                        ColumnDef::new(Medicines::Mrp)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Medicines::SellingPrice)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Medicines::StockQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Medicines::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Medicines::ExpiryDate).date().null())
                    .col(
                        ColumnDef::new(Medicines::RequiresPrescription)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Medicines::Source)
                            .text()
                            .not_null()
                            .default("manual"),
                    )
                    .col(
                        ColumnDef::new(Medicines::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Medicines::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Medicines::UpdatedAt)
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
                    .name("idx_medicines_external_product_id")
                    .table(Medicines::Table)
                    .col(Medicines::ExternalProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_medicines_source")
                    .table(Medicines::Table)
                    .col(Medicines::Source)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Medicines::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Medicines {
    Table,
    Id,
    ExternalProductId,
    Name,
    Manufacturer,
    Category,
    Composition,
    PackSize,
    Mrp,
    SellingPrice,
    StockQuantity,
    IsAvailable,
    ExpiryDate,
    RequiresPrescription,
    Source,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}
