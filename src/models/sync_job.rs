//! SyncJob entity model
//!
//! This module contains the SeaORM entity model for the evitalrx_scheduled_jobs
//! table, which holds scheduled or manually triggered pharmacy sync work.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Scheduled pharmacy sync job
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evitalrx_scheduled_jobs")]
pub struct Model {
    /// Unique identifier for the sync job (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Type of job (products, stock, orders)
    pub job_type: String,

    /// Current status of the job (pending, running, completed, failed)
    pub status: String,

    /// Earliest time the job may run
    pub scheduled_at: DateTimeWithTimeZone,

    /// Timestamp when the current or last attempt started
    pub started_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the job reached a terminal state
    pub completed_at: Option<DateTimeWithTimeZone>,

    /// Number of failed attempts that were rescheduled
    pub retry_count: i32,

    /// Retry budget for this job
    pub max_retries: i32,

    /// Last error observed, kept after terminal failure
    pub error_message: Option<String>,

    /// Job specific parameters
    #[sea_orm(column_type = "JsonBinary")]
    pub config: Option<JsonValue>,

    /// Timestamp when the sync job was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the sync job was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
