//! SyncLog entity model
//!
//! Aggregate outcome of one sync run. Used by dashboards and by the scheduler
//! to decide whether a catch-up run is due.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evitalrx_sync_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Job that produced this run, if any
    pub job_id: Option<Uuid>,

    /// Same vocabulary as the job type
    pub sync_type: String,

    /// running, success, partial or failed
    pub status: String,

    pub total_records: i32,

    pub processed_records: i32,

    pub failed_records: i32,

    pub error_message: Option<String>,

    pub started_at: DateTimeWithTimeZone,

    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
