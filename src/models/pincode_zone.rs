//! Pincode to zone mapping owned by location management.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "enhanced_pincode_zones")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pincode: String,

    pub zone_id: Uuid,

    pub city: Option<String>,

    /// Inactive mappings are treated as unserviceable
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
