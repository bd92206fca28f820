//! Pincode to zone lookups.
//!
//! The mapping is owned by location management; the engine only reads it.
//! `upsert` exists for provisioning scripts and tests.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::db::to_db_time;
use crate::models::pincode_zone::{ActiveModel, Column, Entity as PincodeZone, Model};

#[derive(Debug, Clone)]
pub struct PincodeZoneRepository {
    db: Arc<DatabaseConnection>,
}

impl PincodeZoneRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Zone for an active mapping of `pincode`.
    pub async fn resolve_zone(&self, pincode: &str) -> Result<Option<Uuid>, DbErr> {
        let mapping = PincodeZone::find_by_id(pincode.to_string())
            .filter(Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?;
        Ok(mapping.map(|mapping| mapping.zone_id))
    }

    pub async fn upsert(
        &self,
        pincode: &str,
        zone_id: Uuid,
        city: Option<String>,
        is_active: bool,
    ) -> Result<Model, DbErr> {
        let model = ActiveModel {
            pincode: Set(pincode.to_string()),
            zone_id: Set(zone_id),
            city: Set(city),
            is_active: Set(is_active),
            created_at: Set(to_db_time(Utc::now())),
        };

        PincodeZone::insert(model)
            .on_conflict(
                OnConflict::column(Column::Pincode)
                    .update_columns([Column::ZoneId, Column::City, Column::IsActive])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        PincodeZone::find_by_id(pincode.to_string())
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("pincode {pincode} missing after upsert")))
    }
}
