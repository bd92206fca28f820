//! Zone service config repository
//!
//! Reads and writes `zone_service_configs`. Writes are upserts keyed by
//! `(zone_id, service_type)`, so the last writer wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::db::to_db_time;
use crate::models::zone_service_config::{ActiveModel, Column, Entity as ZoneServiceConfig, Model};

/// Repository for zone service configuration rows
#[derive(Debug, Clone)]
pub struct ZoneServiceConfigRepository {
    db: Arc<DatabaseConnection>,
}

impl ZoneServiceConfigRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(&self, zone_id: Uuid, service_type: &str) -> Result<Option<Model>, DbErr> {
        ZoneServiceConfig::find()
            .filter(Column::ZoneId.eq(zone_id))
            .filter(Column::ServiceType.eq(service_type))
            .one(self.db.as_ref())
            .await
    }

    pub async fn list_by_zone(&self, zone_id: Uuid) -> Result<Vec<Model>, DbErr> {
        ZoneServiceConfig::find()
            .filter(Column::ZoneId.eq(zone_id))
            .order_by_asc(Column::ServiceType)
            .all(self.db.as_ref())
            .await
    }

    /// Insert or replace the row for the model's `(zone_id, service_type)`.
    ///
    /// An existing row keeps its `id` and `created_at`.
    pub async fn upsert(&self, model: ActiveModel) -> Result<Model, DbErr> {
        let zone_id = model.zone_id.clone().take();
        let service_type = model.service_type.clone().take();
        let (Some(zone_id), Some(service_type)) = (zone_id, service_type) else {
            return Err(DbErr::Custom(
                "zone_id and service_type must be set for upsert".to_string(),
            ));
        };

        let on_conflict = OnConflict::columns([Column::ZoneId, Column::ServiceType])
            .update_columns([
                Column::IsEnabled,
                Column::DeliveryFee,
                Column::MinOrderAmount,
                Column::MaxOrderAmount,
                Column::PeakHourMultiplier,
                Column::DistanceBasedPricing,
                Column::EstimatedDeliveryTime,
                Column::OperatingHours,
                Column::CapacityPerHour,
                Column::StaffRequired,
                Column::EquipmentRequired,
                Column::AdvanceBookingDays,
                Column::EmergencyAvailable,
                Column::PrescriptionRequired,
                Column::AgeMin,
                Column::AgeMax,
                Column::SpecialRequirements,
                Column::CustomConfig,
                Column::UpdatedAt,
            ])
            .to_owned();

        ZoneServiceConfig::insert(model)
            .on_conflict(on_conflict)
            .exec_without_returning(self.db.as_ref())
            .await?;

        self.find(zone_id, &service_type).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!(
                "zone service config {zone_id}/{service_type} missing after upsert"
            ))
        })
    }

    /// Flip `is_enabled`. Returns the updated row, `None` when absent.
    pub async fn set_enabled(
        &self,
        zone_id: Uuid,
        service_type: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Model>, DbErr> {
        let result = ZoneServiceConfig::update_many()
            .col_expr(Column::IsEnabled, Expr::value(enabled))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)))
            .filter(Column::ZoneId.eq(zone_id))
            .filter(Column::ServiceType.eq(service_type))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find(zone_id, service_type).await
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, zone_id: Uuid, service_type: &str) -> Result<bool, DbErr> {
        let result = ZoneServiceConfig::delete_many()
            .filter(Column::ZoneId.eq(zone_id))
            .filter(Column::ServiceType.eq(service_type))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
