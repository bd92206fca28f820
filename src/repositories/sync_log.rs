//! Sync run logs.
//!
//! One row per execution of a sync routine. Progress counters are written
//! while the run is in flight so dashboards can follow it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::db::to_db_time;
use crate::models::sync_log::{ActiveModel, Column, Entity as SyncLog, Model};
use crate::sync::{JobType, SyncRunStatus};

#[derive(Debug, Clone)]
pub struct SyncLogRepository {
    db: Arc<DatabaseConnection>,
}

fn count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl SyncLogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn start(
        &self,
        job_id: Option<Uuid>,
        sync_type: JobType,
        now: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job_id),
            sync_type: Set(sync_type.as_str().to_string()),
            status: Set(SyncRunStatus::Running.as_str().to_string()),
            total_records: Set(0),
            processed_records: Set(0),
            failed_records: Set(0),
            error_message: Set(None),
            started_at: Set(to_db_time(now)),
            completed_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
    }

    pub async fn record_progress(
        &self,
        log_id: Uuid,
        total: u32,
        processed: u32,
        failed: u32,
    ) -> Result<(), DbErr> {
        SyncLog::update_many()
            .col_expr(Column::TotalRecords, Expr::value(count(total)))
            .col_expr(Column::ProcessedRecords, Expr::value(count(processed)))
            .col_expr(Column::FailedRecords, Expr::value(count(failed)))
            .filter(Column::Id.eq(log_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn finish(
        &self,
        log_id: Uuid,
        status: SyncRunStatus,
        total: u32,
        processed: u32,
        failed: u32,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        SyncLog::update_many()
            .col_expr(Column::Status, Expr::value(status.as_str()))
            .col_expr(Column::TotalRecords, Expr::value(count(total)))
            .col_expr(Column::ProcessedRecords, Expr::value(count(processed)))
            .col_expr(Column::FailedRecords, Expr::value(count(failed)))
            .col_expr(Column::ErrorMessage, Expr::value(error_message))
            .col_expr(Column::CompletedAt, Expr::value(to_db_time(now)))
            .filter(Column::Id.eq(log_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn find(&self, log_id: Uuid) -> Result<Option<Model>, DbErr> {
        SyncLog::find_by_id(log_id).one(self.db.as_ref()).await
    }

    /// Most recent run of this type that finished as success or partial.
    pub async fn last_completed(&self, sync_type: JobType) -> Result<Option<Model>, DbErr> {
        SyncLog::find()
            .filter(Column::SyncType.eq(sync_type.as_str()))
            .filter(Column::Status.is_in([
                SyncRunStatus::Success.as_str(),
                SyncRunStatus::Partial.as_str(),
            ]))
            .filter(Column::CompletedAt.is_not_null())
            .order_by_desc(Column::CompletedAt)
            .one(self.db.as_ref())
            .await
    }

    /// Newest first
    pub async fn list(&self, sync_type: Option<JobType>, limit: u64) -> Result<Vec<Model>, DbErr> {
        let mut query = SyncLog::find().order_by_desc(Column::StartedAt);
        if let Some(sync_type) = sync_type {
            query = query.filter(Column::SyncType.eq(sync_type.as_str()));
        }
        query.limit(limit).all(self.db.as_ref()).await
    }
}
