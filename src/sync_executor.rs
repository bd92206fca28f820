//! Sync Executor
//!
//! Takes one persisted sync job through its lifecycle: claim it, run the
//! matching sync routine, then complete, reschedule or fail it.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::repositories::SyncJobRepository;
use crate::sync::{JobStatus, JobType, RetryPolicy, SyncError, SyncOutcome, SyncRunner};

/// What happened to a job handed to [`SyncExecutor::execute_job`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed(SyncOutcome),
    /// Back to pending for another attempt.
    Rescheduled {
        retry_count: u32,
        scheduled_at: DateTime<Utc>,
        error: String,
    },
    Failed { error: String },
    /// Not pending, or claimed by someone else first.
    Skipped,
}

impl ExecutionOutcome {
    fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Completed(_) => "completed",
            ExecutionOutcome::Rescheduled { .. } => "rescheduled",
            ExecutionOutcome::Failed { .. } => "failed",
            ExecutionOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Clone)]
pub struct SyncExecutor {
    jobs: SyncJobRepository,
    runner: SyncRunner,
    retry: RetryPolicy,
    clock: SharedClock,
}

impl SyncExecutor {
    pub fn new(
        db: Arc<DatabaseConnection>,
        runner: SyncRunner,
        retry: RetryPolicy,
        clock: SharedClock,
    ) -> Self {
        Self {
            jobs: SyncJobRepository::new(db),
            runner,
            retry,
            clock,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run the job with `job_id` if it is still pending.
    ///
    /// Only database errors while moving the job between states surface as
    /// `Err`; failures of the sync itself are recorded on the job.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn execute_job(&self, job_id: Uuid) -> Result<ExecutionOutcome, DbErr> {
        let Some(job) = self.jobs.find(job_id).await? else {
            debug!("Job vanished before execution");
            return Ok(ExecutionOutcome::Skipped);
        };
        if job.status != JobStatus::Pending.as_str() {
            debug!(status = %job.status, "Job is not pending");
            return Ok(ExecutionOutcome::Skipped);
        }
        if !self.jobs.claim(job_id, self.clock.now()).await? {
            debug!("Job was claimed elsewhere");
            return Ok(ExecutionOutcome::Skipped);
        }

        let retry_count = u32::try_from(job.retry_count).unwrap_or(0);
        let max_retries = u32::try_from(job.max_retries).unwrap_or(0);
        info!(job_type = %job.job_type, attempt = retry_count + 1, "Sync job started");

        let started = Instant::now();
        let result = match JobType::from_str(&job.job_type) {
            Ok(job_type) => self.runner.run(job_type, Some(job_id)).await,
            Err(err) => Err(err),
        };
        histogram!("sync_job_duration_seconds", "job_type" => job.job_type.clone())
            .record(started.elapsed().as_secs_f64());

        let outcome = match result {
            Ok(outcome) => {
                self.jobs.complete(job_id, self.clock.now()).await?;
                info!(
                    status = %outcome.status,
                    processed = outcome.processed,
                    failed = outcome.failed,
                    "Sync job completed"
                );
                ExecutionOutcome::Completed(outcome)
            }
            Err(SyncError::Cancelled) => {
                // interrupted by shutdown, not a failed attempt
                let now = self.clock.now();
                self.jobs
                    .reschedule(job_id, retry_count, now, "interrupted by shutdown", now)
                    .await?;
                warn!("Sync job interrupted, returned to pending");
                ExecutionOutcome::Rescheduled {
                    retry_count,
                    scheduled_at: now,
                    error: SyncError::Cancelled.to_string(),
                }
            }
            Err(err) => self.handle_failure(job_id, retry_count, max_retries, err).await?,
        };

        counter!("sync_jobs_total", "job_type" => job.job_type, "outcome" => outcome.label())
            .increment(1);
        Ok(outcome)
    }

    async fn handle_failure(
        &self,
        job_id: Uuid,
        retry_count: u32,
        max_retries: u32,
        err: SyncError,
    ) -> Result<ExecutionOutcome, DbErr> {
        let message = err.to_string();
        let now = self.clock.now();
        let next_retry = retry_count.saturating_add(1);

        if err.is_retryable() && next_retry < max_retries {
            let scheduled_at = now + self.retry.delay(retry_count);
            self.jobs
                .reschedule(job_id, next_retry, scheduled_at, &message, now)
                .await?;
            warn!(
                retry_count = next_retry,
                max_retries,
                %scheduled_at,
                error = %message,
                "Sync job failed, retry scheduled"
            );
            return Ok(ExecutionOutcome::Rescheduled {
                retry_count: next_retry,
                scheduled_at,
                error: message,
            });
        }

        self.jobs.fail(job_id, &message, now).await?;
        error!(
            retry_count,
            max_retries,
            retryable = err.is_retryable(),
            error = %message,
            "Sync job failed permanently"
        );
        Ok(ExecutionOutcome::Failed { error: message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncRunStatus;

    #[test]
    fn outcome_labels() {
        assert_eq!(ExecutionOutcome::Skipped.label(), "skipped");
        assert_eq!(
            ExecutionOutcome::Completed(SyncOutcome {
                status: SyncRunStatus::Success,
                total: 0,
                processed: 0,
                failed: 0,
            })
            .label(),
            "completed"
        );
        assert_eq!(
            ExecutionOutcome::Failed {
                error: "x".into()
            }
            .label(),
            "failed"
        );
    }
}
