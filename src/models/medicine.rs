//! Medicine entity model
//!
//! Catalogue rows. Rows pulled from the external pharmacy carry
//! `source = "evitalrx"` and a unique `external_product_id`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Source tag for rows written by the pharmacy sync.
pub const SOURCE_EVITALRX: &str = "evitalrx";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "medicines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product id in the external pharmacy system (conflict key for upserts)
    #[sea_orm(unique)]
    pub external_product_id: Option<String>,

    pub name: String,

    pub manufacturer: Option<String>,

    pub category: Option<String>,

    pub composition: Option<String>,

    pub pack_size: Option<String>,

    pub mrp: f64,

    pub selling_price: f64,

    pub stock_quantity: i32,

    pub is_available: bool,

    pub expiry_date: Option<Date>,

    pub requires_prescription: bool,

    pub source: String,

    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
