//! Hot-reloadable sync settings, stored as a single row with id 1.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

/// Primary key of the only settings row.
pub const SETTINGS_ROW_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evitalrx_sync_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub enabled: bool,

    pub interval_minutes: i32,

    /// JSON array of job type slugs
    #[sea_orm(column_type = "JsonBinary")]
    pub job_types: JsonValue,

    pub max_retries: i32,

    pub retry_delay_seconds: i32,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
