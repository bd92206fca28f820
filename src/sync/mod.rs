//! Scheduled synchronization with the external pharmacy.
//!
//! Jobs live in `evitalrx_scheduled_jobs` and move through
//! `pending -> running -> completed | pending (retry) | failed`. Each run of
//! a sync routine also writes an aggregate row to `evitalrx_sync_logs`.

pub mod backoff;
pub mod job;
pub mod orders;
pub mod products;
pub mod settings;
pub mod stock;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::pharmacy::{PharmacyApi, PharmacyApiError};
use crate::repositories::{MedicineRepository, SyncLogRepository};

pub use backoff::RetryPolicy;
pub use job::{JobStatus, JobType, SyncRunStatus};
pub use settings::{SyncSettings, SyncSettingsUpdate};

/// Counts reported by one sync routine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub status: SyncRunStatus,
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
}

/// Running tallies for one sync run, flushed to its log row.
#[derive(Debug, Clone, Copy, Default)]
struct RunTally {
    processed: u32,
    failed: u32,
}

impl RunTally {
    fn total(&self) -> u32 {
        self.processed + self.failed
    }

    fn made_progress(&self) -> bool {
        self.total() > 0
    }
}

/// Runs the individual sync routines against the pharmacy API.
#[derive(Clone)]
pub struct SyncRunner {
    api: Arc<dyn PharmacyApi>,
    medicines: MedicineRepository,
    logs: SyncLogRepository,
    clock: SharedClock,
    page_size: u32,
    shutdown: CancellationToken,
}

impl SyncRunner {
    pub fn new(
        api: Arc<dyn PharmacyApi>,
        db: Arc<DatabaseConnection>,
        clock: SharedClock,
        page_size: u32,
    ) -> Self {
        Self {
            api,
            medicines: MedicineRepository::new(db.clone()),
            logs: SyncLogRepository::new(db),
            clock,
            page_size: page_size.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop between pages once `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(
        &self,
        job_type: JobType,
        job_id: Option<Uuid>,
    ) -> Result<SyncOutcome, SyncError> {
        match job_type {
            JobType::Products => self.sync_products(job_id).await,
            JobType::Stock => self.sync_stock_levels(job_id).await,
            JobType::Orders => self.sync_orders(job_id).await,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Close the log row for a run that ended normally.
    async fn finish_run(
        &self,
        log_id: Uuid,
        job_type: JobType,
        tally: RunTally,
    ) -> Result<SyncOutcome, SyncError> {
        let status = SyncRunStatus::from_counts(tally.failed);
        self.logs
            .finish(
                log_id,
                status,
                tally.total(),
                tally.processed,
                tally.failed,
                None,
                self.now(),
            )
            .await?;
        record_metrics(job_type, tally);
        info!(
            job_type = %job_type,
            status = %status,
            processed = tally.processed,
            failed = tally.failed,
            "Sync run finished"
        );
        Ok(SyncOutcome {
            status,
            total: tally.total(),
            processed: tally.processed,
            failed: tally.failed,
        })
    }

    /// Close the log row for a run cut short by `err`.
    ///
    /// With progress the run is kept as partial and succeeds; without any it
    /// is marked failed and the error goes back to the caller.
    async fn abort_run(
        &self,
        log_id: Uuid,
        job_type: JobType,
        tally: RunTally,
        err: SyncError,
    ) -> Result<SyncOutcome, SyncError> {
        let keep_partial = tally.made_progress() && !matches!(err, SyncError::Cancelled);
        let status = if keep_partial {
            SyncRunStatus::Partial
        } else {
            SyncRunStatus::Failed
        };
        self.logs
            .finish(
                log_id,
                status,
                tally.total(),
                tally.processed,
                tally.failed,
                Some(err.to_string()),
                self.now(),
            )
            .await?;
        record_metrics(job_type, tally);
        warn!(
            job_type = %job_type,
            status = %status,
            processed = tally.processed,
            failed = tally.failed,
            error = %err,
            "Sync run stopped early"
        );

        if keep_partial {
            Ok(SyncOutcome {
                status,
                total: tally.total(),
                processed: tally.processed,
                failed: tally.failed,
            })
        } else {
            Err(err)
        }
    }
}

fn record_metrics(job_type: JobType, tally: RunTally) {
    counter!("sync_records_processed_total", "job_type" => job_type.as_str())
        .increment(u64::from(tally.processed));
    counter!("sync_records_failed_total", "job_type" => job_type.as_str())
        .increment(u64::from(tally.failed));
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] PharmacyApiError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("unknown job type '{0}'")]
    UnknownJobType(String),

    #[error("sync job {0} not found")]
    JobNotFound(Uuid),

    #[error("sync job {job_id} is {status}, not pending")]
    NotPending { job_id: Uuid, status: String },

    #[error("invalid sync settings: {0}")]
    InvalidSettings(String),

    #[error("cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether a failed job should be rescheduled.
    ///
    /// Transient upstream errors and database errors retry. Rejections by the
    /// API (bad key, bad request) and malformed payloads do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Api(err) => err.is_transient(),
            SyncError::Database(_) => true,
            SyncError::UnknownJobType(_)
            | SyncError::JobNotFound(_)
            | SyncError::NotPending { .. }
            | SyncError::InvalidSettings(_)
            | SyncError::Cancelled => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(SyncError::Api(PharmacyApiError::Network("timeout".into())).is_retryable());
        assert!(
            SyncError::Api(PharmacyApiError::Http {
                status: 503,
                message: "maintenance".into()
            })
            .is_retryable()
        );
        assert!(
            !SyncError::Api(PharmacyApiError::Http {
                status: 401,
                message: "bad key".into()
            })
            .is_retryable()
        );
        assert!(SyncError::Database(DbErr::Custom("locked".into())).is_retryable());
        assert!(!SyncError::UnknownJobType("inventory".into()).is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
    }
}
