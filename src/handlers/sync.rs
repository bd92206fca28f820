//! # Sync API Handlers
//!
//! Operator endpoints for pharmacy sync jobs, run logs and runtime settings.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::OperatorAuth;
use crate::error::{ApiError, validation_error};
use crate::models::{sync_job, sync_log};
use crate::repositories::JobFilter;
use crate::server::AppState;
use crate::sync::{JobStatus, JobType, SyncError, SyncSettings, SyncSettingsUpdate};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 100;

/// Sync job as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobInfo {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "products")]
    pub job_type: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2025-01-15T10:30:00Z")]
    pub scheduled_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
}

impl From<sync_job::Model> for JobInfo {
    fn from(model: sync_job::Model) -> Self {
        Self {
            id: model.id,
            job_type: model.job_type,
            status: model.status,
            scheduled_at: model.scheduled_at.to_rfc3339(),
            started_at: model.started_at.map(|dt| dt.to_rfc3339()),
            completed_at: model.completed_at.map(|dt| dt.to_rfc3339()),
            retry_count: model.retry_count,
            max_retries: model.max_retries,
            error_message: model.error_message,
        }
    }
}

/// One execution of a sync routine
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncLogInfo {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    #[schema(example = "stock")]
    pub sync_type: String,
    #[schema(example = "partial")]
    pub status: String,
    pub total_records: i32,
    pub processed_records: i32,
    pub failed_records: i32,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl From<sync_log::Model> for SyncLogInfo {
    fn from(model: sync_log::Model) -> Self {
        Self {
            id: model.id,
            job_id: model.job_id,
            sync_type: model.sync_type,
            status: model.status,
            total_records: model.total_records,
            processed_records: model.processed_records,
            failed_records: model.failed_records,
            error_message: model.error_message,
            started_at: model.started_at.to_rfc3339(),
            completed_at: model.completed_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListJobsQuery {
    /// One of: products, stock, orders
    pub job_type: Option<String>,
    /// One of: pending, running, completed, failed
    pub status: Option<String>,
    /// Maximum number of jobs to return (default 50, max 100)
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListLogsQuery {
    /// One of: products, stock, orders
    pub sync_type: Option<String>,
    /// Maximum number of logs to return (default 50, max 100)
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TriggerSyncRequest {
    #[schema(example = "products")]
    pub job_type: String,
}

fn parse_job_type(raw: &str) -> Result<JobType, ApiError> {
    raw.parse::<JobType>().map_err(ApiError::from)
}

fn parse_limit(limit: Option<u64>) -> Result<u64, ApiError> {
    match limit {
        None => Ok(DEFAULT_LIMIT),
        Some(0) => Err(validation_error(
            "Invalid limit",
            json!({ "limit": "Minimum allowed limit is 1" }),
        )),
        Some(value) if value > MAX_LIMIT => Err(validation_error(
            "Invalid limit",
            json!({ "limit": format!("Maximum allowed limit is {MAX_LIMIT}") }),
        )),
        Some(value) => Ok(value),
    }
}

#[utoipa::path(
    get,
    path = "/api/sync/jobs",
    security(("bearer_auth" = [])),
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Sync jobs, most recently scheduled first", body = [JobInfo]),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    query: Result<Query<ListJobsQuery>, QueryRejection>,
) -> Result<Json<Vec<JobInfo>>, ApiError> {
    let Query(params) = query?;
    let job_type = params.job_type.as_deref().map(parse_job_type).transpose()?;
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<JobStatus>().map_err(|_| {
                validation_error(
                    "Invalid status",
                    json!({ "status": "Must be one of: pending, running, completed, failed" }),
                )
            })
        })
        .transpose()?;

    let jobs = state
        .scheduler
        .jobs()
        .list(JobFilter {
            job_type,
            status,
            limit: Some(parse_limit(params.limit)?),
            offset: params.offset,
        })
        .await?;
    Ok(Json(jobs.into_iter().map(JobInfo::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/sync/jobs/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sync job identifier")),
    responses(
        (status = 200, description = "Sync job", body = JobInfo),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Unknown job", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn get_job(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobInfo>, ApiError> {
    let job = state
        .scheduler
        .jobs()
        .find(job_id)
        .await?
        .ok_or(SyncError::JobNotFound(job_id))?;
    Ok(Json(job.into()))
}

/// Enqueue a sync job to run on the next scheduler tick
#[utoipa::path(
    post,
    path = "/api/sync/jobs",
    security(("bearer_auth" = [])),
    request_body = TriggerSyncRequest,
    responses(
        (status = 202, description = "Job enqueued", body = JobInfo),
        (status = 400, description = "Unknown job type", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn trigger_sync(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    body: Result<Json<TriggerSyncRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobInfo>), ApiError> {
    let Json(request) = body?;
    let job_type = parse_job_type(&request.job_type)?;
    let job = state.scheduler.trigger_sync(job_type).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// Cancel a job that has not started yet
#[utoipa::path(
    post,
    path = "/api/sync/jobs/{id}/cancel",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sync job identifier")),
    responses(
        (status = 200, description = "Job cancelled", body = JobInfo),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Unknown job", body = ApiError),
        (status = 409, description = "Job is no longer pending", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobInfo>, ApiError> {
    let job = state.scheduler.cancel_job(job_id).await?;
    Ok(Json(job.into()))
}

#[utoipa::path(
    get,
    path = "/api/sync/logs",
    security(("bearer_auth" = [])),
    params(ListLogsQuery),
    responses(
        (status = 200, description = "Sync runs, newest first", body = [SyncLogInfo]),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    query: Result<Query<ListLogsQuery>, QueryRejection>,
) -> Result<Json<Vec<SyncLogInfo>>, ApiError> {
    let Query(params) = query?;
    let sync_type = params.sync_type.as_deref().map(parse_job_type).transpose()?;
    let logs = state
        .scheduler
        .logs()
        .list(sync_type, parse_limit(params.limit)?)
        .await?;
    Ok(Json(logs.into_iter().map(SyncLogInfo::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/sync/settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current sync settings", body = SyncSettings),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<SyncSettings>, ApiError> {
    Ok(Json(state.scheduler.current_settings().await?))
}

/// Update sync settings; applies from the next scheduler tick
#[utoipa::path(
    put,
    path = "/api/sync/settings",
    security(("bearer_auth" = [])),
    request_body = SyncSettingsUpdate,
    responses(
        (status = 200, description = "Updated sync settings", body = SyncSettings),
        (status = 400, description = "Invalid settings", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "sync"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    body: Result<Json<SyncSettingsUpdate>, JsonRejection>,
) -> Result<Json<SyncSettings>, ApiError> {
    let Json(update) = body?;
    Ok(Json(state.scheduler.update_settings(update).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_bounds() {
        assert_eq!(parse_limit(None).unwrap(), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some(10)).unwrap(), 10);
        assert!(parse_limit(Some(0)).is_err());
        assert!(parse_limit(Some(MAX_LIMIT + 1)).is_err());
    }

    #[test]
    fn unknown_job_type_is_validation_error() {
        let err = parse_job_type("inventory").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
