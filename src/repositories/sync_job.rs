//! # SyncJob Repository
//!
//! Persistence for `evitalrx_scheduled_jobs`. Every state change is a
//! conditional update on the current status, so two callers racing on the
//! same job cannot both win.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::db::to_db_time;
use crate::models::sync_job::{ActiveModel, Column, Entity as SyncJob, Model};
use crate::sync::{JobStatus, JobType};

pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Repository for sync job database operations
#[derive(Debug, Clone)]
pub struct SyncJobRepository {
    db: Arc<DatabaseConnection>,
}

/// Filters for listing jobs
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub status: Option<JobStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SyncJobRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new pending job
    pub async fn enqueue(
        &self,
        job_type: JobType,
        scheduled_at: DateTime<Utc>,
        max_retries: u32,
        config: Option<JsonValue>,
        now: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let job = ActiveModel {
            id: Set(Uuid::new_v4()),
            job_type: Set(job_type.as_str().to_string()),
            status: Set(JobStatus::Pending.as_str().to_string()),
            scheduled_at: Set(to_db_time(scheduled_at)),
            started_at: Set(None),
            completed_at: Set(None),
            retry_count: Set(0),
            max_retries: Set(i32::try_from(max_retries).unwrap_or(i32::MAX)),
            error_message: Set(None),
            config: Set(config),
            created_at: Set(to_db_time(now)),
            updated_at: Set(to_db_time(now)),
        };

        let result = job.insert(self.db.as_ref()).await?;

        tracing::info!(
            job_id = %result.id,
            job_type = %result.job_type,
            scheduled_at = %result.scheduled_at,
            "Sync job enqueued"
        );

        Ok(result)
    }

    pub async fn find(&self, job_id: Uuid) -> Result<Option<Model>, DbErr> {
        SyncJob::find_by_id(job_id).one(self.db.as_ref()).await
    }

    /// Newest first
    pub async fn list(&self, filter: JobFilter) -> Result<Vec<Model>, DbErr> {
        let mut query = SyncJob::find().order_by_desc(Column::ScheduledAt);

        if let Some(job_type) = filter.job_type {
            query = query.filter(Column::JobType.eq(job_type.as_str()));
        }

        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status.as_str()));
        }

        query
            .offset(filter.offset.unwrap_or(0))
            .limit(filter.limit.unwrap_or(50))
            .all(self.db.as_ref())
            .await
    }

    /// Pending jobs whose time has come, oldest first.
    pub async fn due_pending(&self, now: DateTime<Utc>, limit: u64) -> Result<Vec<Model>, DbErr> {
        SyncJob::find()
            .filter(Column::Status.eq(JobStatus::Pending.as_str()))
            .filter(Column::ScheduledAt.lte(to_db_time(now)))
            .order_by_asc(Column::ScheduledAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
    }

    /// Whether a pending or running job of this type exists.
    pub async fn has_active(&self, job_type: JobType) -> Result<bool, DbErr> {
        let active = SyncJob::find()
            .filter(Column::JobType.eq(job_type.as_str()))
            .filter(
                Column::Status.is_in([JobStatus::Pending.as_str(), JobStatus::Running.as_str()]),
            )
            .count(self.db.as_ref())
            .await?;
        Ok(active > 0)
    }

    /// When the most recent job of this type was created.
    pub async fn last_enqueued_at(
        &self,
        job_type: JobType,
    ) -> Result<Option<DateTime<Utc>>, DbErr> {
        let last = SyncJob::find()
            .filter(Column::JobType.eq(job_type.as_str()))
            .order_by_desc(Column::CreatedAt)
            .one(self.db.as_ref())
            .await?;
        Ok(last.map(|job| job.created_at.to_utc()))
    }

    /// `pending -> running`. Returns false when someone else got there first.
    pub async fn claim(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<bool, DbErr> {
        let result = SyncJob::update_many()
            .col_expr(Column::Status, Expr::value(JobStatus::Running.as_str()))
            .col_expr(Column::StartedAt, Expr::value(to_db_time(now)))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)))
            .filter(Column::Id.eq(job_id))
            .filter(Column::Status.eq(JobStatus::Pending.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// `running -> completed`
    pub async fn complete(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<bool, DbErr> {
        let result = SyncJob::update_many()
            .col_expr(Column::Status, Expr::value(JobStatus::Completed.as_str()))
            .col_expr(Column::CompletedAt, Expr::value(to_db_time(now)))
            .col_expr(Column::ErrorMessage, Expr::value(Option::<String>::None))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)))
            .filter(Column::Id.eq(job_id))
            .filter(Column::Status.eq(JobStatus::Running.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// `running -> pending` with the retry counter bumped.
    pub async fn reschedule(
        &self,
        job_id: Uuid,
        retry_count: u32,
        scheduled_at: DateTime<Utc>,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let result = SyncJob::update_many()
            .col_expr(Column::Status, Expr::value(JobStatus::Pending.as_str()))
            .col_expr(
                Column::RetryCount,
                Expr::value(i32::try_from(retry_count).unwrap_or(i32::MAX)),
            )
            .col_expr(Column::ScheduledAt, Expr::value(to_db_time(scheduled_at)))
            .col_expr(Column::StartedAt, Expr::value(Option::<DateTime<FixedOffset>>::None))
            .col_expr(Column::ErrorMessage, Expr::value(error_message))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)))
            .filter(Column::Id.eq(job_id))
            .filter(Column::Status.eq(JobStatus::Running.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// `running -> failed`
    pub async fn fail(
        &self,
        job_id: Uuid,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        self.finish_failed(job_id, JobStatus::Running, error_message, now)
            .await
    }

    /// `pending -> failed` with the cancellation message.
    pub async fn cancel_pending(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<bool, DbErr> {
        self.finish_failed(job_id, JobStatus::Pending, CANCELLED_MESSAGE, now)
            .await
    }

    async fn finish_failed(
        &self,
        job_id: Uuid,
        from: JobStatus,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let result = SyncJob::update_many()
            .col_expr(Column::Status, Expr::value(JobStatus::Failed.as_str()))
            .col_expr(Column::CompletedAt, Expr::value(to_db_time(now)))
            .col_expr(Column::ErrorMessage, Expr::value(error_message))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)))
            .filter(Column::Id.eq(job_id))
            .filter(Column::Status.eq(from.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Put jobs left `running` by a previous process back to pending.
    pub async fn requeue_stale_running(
        &self,
        started_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let result = SyncJob::update_many()
            .col_expr(Column::Status, Expr::value(JobStatus::Pending.as_str()))
            .col_expr(Column::StartedAt, Expr::value(Option::<DateTime<FixedOffset>>::None))
            .col_expr(Column::ScheduledAt, Expr::value(to_db_time(now)))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)))
            .filter(Column::Status.eq(JobStatus::Running.as_str()))
            .filter(Column::StartedAt.lt(to_db_time(started_before)))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete completed and failed jobs last touched before `cutoff`.
    pub async fn delete_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = SyncJob::delete_many()
            .filter(
                Column::Status.is_in([JobStatus::Completed.as_str(), JobStatus::Failed.as_str()]),
            )
            .filter(Column::UpdatedAt.lt(to_db_time(cutoff)))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}
