//! ZoneServiceConfig entity model
//!
//! One row per (zone, service type). Structured fields are stored as JSON and
//! decoded into domain types by `crate::zones::config`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "zone_service_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Zone this configuration belongs to
    pub zone_id: Uuid,

    /// Service type slug (e.g. medicine_delivery)
    pub service_type: String,

    pub is_enabled: bool,

    pub delivery_fee: f64,

    pub min_order_amount: f64,

    pub max_order_amount: Option<f64>,

    /// Multiplier applied to the order value during peak windows (>= 1.0)
    pub peak_hour_multiplier: f64,

    pub distance_based_pricing: bool,

    /// Free text shown to customers, e.g. "30-45 mins"
    pub estimated_delivery_time: String,

    /// Weekday keyed schedule with open/close and breaks
    #[sea_orm(column_type = "JsonBinary")]
    pub operating_hours: JsonValue,

    pub capacity_per_hour: i32,

    pub staff_required: i32,

    #[sea_orm(column_type = "JsonBinary")]
    pub equipment_required: JsonValue,

    pub advance_booking_days: i32,

    pub emergency_available: bool,

    pub prescription_required: bool,

    pub age_min: Option<i32>,

    pub age_max: Option<i32>,

    #[sea_orm(column_type = "JsonBinary")]
    pub special_requirements: JsonValue,

    /// Service specific extension, tagged by service type
    #[sea_orm(column_type = "JsonBinary")]
    pub custom_config: JsonValue,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
