//! Migration to create the enhanced_pincode_zones table.
//!
//! Owned by location management; the engine only reads it to resolve a
//! pincode to its zone.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EnhancedPincodeZones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnhancedPincodeZones::Pincode)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnhancedPincodeZones::ZoneId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnhancedPincodeZones::City).text().null())
                    .col(
                        ColumnDef::new(EnhancedPincodeZones::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EnhancedPincodeZones::CreatedAt)
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
                    .name("idx_enhanced_pincode_zones_zone")
                    .table(EnhancedPincodeZones::Table)
                    .col(EnhancedPincodeZones::ZoneId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnhancedPincodeZones::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EnhancedPincodeZones {
    Table,
    Pincode,
    ZoneId,
    City,
    IsActive,
    CreatedAt,
}
