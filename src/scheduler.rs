//! # Sync Scheduler
//!
//! Background task that keeps pharmacy sync jobs flowing. Every tick it
//! re-reads the runtime settings, enqueues a job for each enabled type whose
//! interval has elapsed, then executes due pending jobs one at a time.
//!
//! A job type is never enqueued while another job of that type is pending or
//! running, and never executed twice at once in this process.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge, histogram};
use sea_orm::{DatabaseConnection, DbErr};
use tokio::task::JoinHandle;
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::config::SyncConfig;
use crate::models::sync_job::Model as SyncJobModel;
use crate::repositories::{SyncJobRepository, SyncLogRepository, SyncSettingsRepository};
use crate::sync::{JobStatus, JobType, SyncError, SyncSettings, SyncSettingsUpdate};
use crate::sync_executor::{ExecutionOutcome, SyncExecutor};

/// Most due jobs executed in a single tick.
const DUE_BATCH_SIZE: u64 = 32;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickStats {
    pub jobs_enqueued: u64,
    pub jobs_skipped_active: u64,
    pub jobs_skipped_not_due: u64,
    pub jobs_executed: u64,
    pub jobs_skipped_in_flight: u64,
    pub jobs_with_errors: u64,
}

/// Background scheduler service.
#[derive(Clone)]
pub struct SyncScheduler {
    config: SyncConfig,
    jobs: SyncJobRepository,
    logs: SyncLogRepository,
    settings: SyncSettingsRepository,
    executor: SyncExecutor,
    clock: SharedClock,
    in_flight: Arc<Mutex<HashSet<JobType>>>,
}

impl SyncScheduler {
    pub fn new(
        config: SyncConfig,
        db: Arc<DatabaseConnection>,
        executor: SyncExecutor,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            jobs: SyncJobRepository::new(db.clone()),
            logs: SyncLogRepository::new(db.clone()),
            settings: SyncSettingsRepository::new(db),
            executor,
            clock,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn jobs(&self) -> &SyncJobRepository {
        &self.jobs
    }

    pub fn logs(&self) -> &SyncLogRepository {
        &self.logs
    }

    pub fn executor(&self) -> &SyncExecutor {
        &self.executor
    }

    /// Spawn [`Self::run`] on the runtime.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.tick_interval_seconds,
            "Starting sync scheduler"
        );

        match self.recover_interrupted().await {
            Ok(0) => {}
            Ok(requeued) => warn!(requeued, "Requeued jobs left running by a previous process"),
            Err(err) => error!(error = %err, "Failed to requeue interrupted jobs"),
        }
        match self.catch_up().await {
            Ok(enqueued) if !enqueued.is_empty() => {
                info!(enqueued = enqueued.len(), "Startup catch-up enqueued jobs");
                if !shutdown.is_cancelled() {
                    self.timed_tick().await;
                }
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "Startup catch-up failed"),
        }

        let tick_interval = TokioDuration::from_secs(self.config.tick_interval_seconds.max(1));
        let mut last_cleanup: Option<DateTime<Utc>> = None;
        loop {
            let now = self.clock.now();
            if last_cleanup.is_none_or(|at| now - at >= Duration::days(1)) {
                if let Err(err) = self.cleanup_old_jobs().await {
                    error!(error = %err, "Sync job cleanup failed");
                }
                last_cleanup = Some(now);
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => self.timed_tick().await,
            }
        }

        info!("Sync scheduler stopped");
    }

    async fn timed_tick(&self) {
        let tick_started = Instant::now();
        if let Err(err) = self.tick().await {
            error!(error = %err, "Scheduler tick failed");
        }
        histogram!("sync_scheduler_tick_duration_ms")
            .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
    }

    /// Current settings, seeded from configuration on first use.
    pub async fn current_settings(&self) -> Result<SyncSettings, SyncError> {
        let seed = SyncSettings::from_config(&self.config, self.clock.now());
        let row = self.settings.get_or_init(&seed).await?;
        SyncSettings::try_from(row)
    }

    pub async fn update_settings(
        &self,
        update: SyncSettingsUpdate,
    ) -> Result<SyncSettings, SyncError> {
        let mut settings = self.current_settings().await?;
        settings
            .apply(update)
            .map_err(SyncError::InvalidSettings)?;
        let row = self.settings.save(&settings, self.clock.now()).await?;
        info!(
            enabled = settings.enabled,
            interval_minutes = settings.interval_minutes,
            "Sync settings updated"
        );
        SyncSettings::try_from(row)
    }

    /// Jobs still marked running when the process starts were cut off.
    async fn recover_interrupted(&self) -> Result<u64, DbErr> {
        let now = self.clock.now();
        self.jobs.requeue_stale_running(now, now).await
    }

    /// Enqueue every enabled type whose last good run is older than two
    /// intervals, or that never ran.
    #[instrument(skip(self))]
    pub async fn catch_up(&self) -> Result<Vec<SyncJobModel>, SyncError> {
        let settings = self.current_settings().await?;
        if !settings.enabled {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let stale_before = now - settings.interval() * 2;
        let mut enqueued = Vec::new();

        for &job_type in &settings.job_types {
            let last_run = self
                .logs
                .last_completed(job_type)
                .await?
                .and_then(|log| log.completed_at)
                .map(|completed_at| completed_at.to_utc());
            let overdue = last_run.is_none_or(|completed_at| completed_at < stale_before);
            if !overdue || self.jobs.has_active(job_type).await? {
                continue;
            }

            debug!(job_type = %job_type, ?last_run, "Catching up on missed sync");
            let job = self
                .jobs
                .enqueue(job_type, now, settings.max_retries, None, now)
                .await?;
            counter!(
                "sync_scheduler_jobs_scheduled_total",
                "job_type" => job_type.as_str(),
                "reason" => "catch_up"
            )
            .increment(1);
            enqueued.push(job);
        }

        Ok(enqueued)
    }

    /// One scheduling pass: enqueue what is due, then run what is pending.
    pub async fn tick(&self) -> Result<TickStats, SyncError> {
        let mut stats = TickStats::default();
        let settings = self.current_settings().await?;

        if !settings.enabled {
            debug!("Sync disabled, skipping tick");
            return Ok(stats);
        }

        self.enqueue_due(&settings, &mut stats).await?;
        self.run_due_jobs(&settings, &mut stats).await?;

        debug!(
            enqueued = stats.jobs_enqueued,
            skipped_active = stats.jobs_skipped_active,
            skipped_not_due = stats.jobs_skipped_not_due,
            executed = stats.jobs_executed,
            skipped_in_flight = stats.jobs_skipped_in_flight,
            errors = stats.jobs_with_errors,
            "Scheduler tick completed"
        );
        Ok(stats)
    }

    async fn enqueue_due(
        &self,
        settings: &SyncSettings,
        stats: &mut TickStats,
    ) -> Result<(), SyncError> {
        let now = self.clock.now();

        for &job_type in &settings.job_types {
            if self.jobs.has_active(job_type).await? {
                stats.jobs_skipped_active += 1;
                continue;
            }

            let last = self.jobs.last_enqueued_at(job_type).await?;
            if !is_due(last, settings.interval(), now) {
                stats.jobs_skipped_not_due += 1;
                continue;
            }

            self.jobs
                .enqueue(job_type, now, settings.max_retries, None, now)
                .await?;
            stats.jobs_enqueued += 1;
            counter!(
                "sync_scheduler_jobs_scheduled_total",
                "job_type" => job_type.as_str(),
                "reason" => "interval"
            )
            .increment(1);
        }

        Ok(())
    }

    async fn run_due_jobs(
        &self,
        settings: &SyncSettings,
        stats: &mut TickStats,
    ) -> Result<(), SyncError> {
        let due = self.jobs.due_pending(self.clock.now(), DUE_BATCH_SIZE).await?;
        gauge!("sync_scheduler_due_jobs").set(due.len() as f64);
        if due.is_empty() {
            return Ok(());
        }

        let retry = self
            .executor
            .retry_policy()
            .with_base_seconds(settings.retry_delay_seconds);
        let executor = self.executor.clone().with_retry_policy(retry);

        for job in due {
            match self.execute_guarded(&executor, &job).await {
                Ok(Some(_)) => stats.jobs_executed += 1,
                Ok(None) => stats.jobs_skipped_in_flight += 1,
                Err(err) => {
                    stats.jobs_with_errors += 1;
                    error!(job_id = %job.id, error = %err, "Failed to execute sync job");
                }
            }
        }

        Ok(())
    }

    /// Execute `job` unless a job of the same type is already in flight.
    async fn execute_guarded(
        &self,
        executor: &SyncExecutor,
        job: &SyncJobModel,
    ) -> Result<Option<ExecutionOutcome>, DbErr> {
        // unknown types go straight to the executor, which fails them
        let Ok(job_type) = job.job_type.parse::<JobType>() else {
            return executor.execute_job(job.id).await.map(Some);
        };

        if !self.mark_in_flight(job_type) {
            debug!(job_id = %job.id, job_type = %job_type, "Job type already in flight");
            return Ok(None);
        }
        let in_flight = self.in_flight.clone();
        let _guard = scopeguard::guard((), move |_| {
            let mut running = in_flight
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            running.remove(&job_type);
        });

        executor.execute_job(job.id).await.map(Some)
    }

    fn mark_in_flight(&self, job_type: JobType) -> bool {
        let mut running = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        running.insert(job_type)
    }

    /// Enqueue a job of `job_type` to run on the next tick.
    #[instrument(skip(self))]
    pub async fn trigger_sync(&self, job_type: JobType) -> Result<SyncJobModel, SyncError> {
        let settings = self.current_settings().await?;
        let now = self.clock.now();
        let job = self
            .jobs
            .enqueue(job_type, now, settings.max_retries, None, now)
            .await?;
        counter!(
            "sync_scheduler_jobs_scheduled_total",
            "job_type" => job_type.as_str(),
            "reason" => "manual"
        )
        .increment(1);
        Ok(job)
    }

    /// Cancel a job that has not started yet.
    #[instrument(skip(self))]
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<SyncJobModel, SyncError> {
        let job = self
            .jobs
            .find(job_id)
            .await?
            .ok_or(SyncError::JobNotFound(job_id))?;
        if job.status != JobStatus::Pending.as_str() {
            return Err(SyncError::NotPending {
                job_id,
                status: job.status,
            });
        }

        if !self.jobs.cancel_pending(job_id, self.clock.now()).await? {
            // claimed between the read and the update
            let current = self
                .jobs
                .find(job_id)
                .await?
                .ok_or(SyncError::JobNotFound(job_id))?;
            return Err(SyncError::NotPending {
                job_id,
                status: current.status,
            });
        }

        info!(job_id = %job_id, "Sync job cancelled");
        self.jobs
            .find(job_id)
            .await?
            .ok_or(SyncError::JobNotFound(job_id))
    }

    /// Delete finished jobs older than the retention window.
    pub async fn cleanup_old_jobs(&self) -> Result<u64, DbErr> {
        let cutoff = self.clock.now() - Duration::days(i64::from(self.config.job_retention_days));
        let deleted = self.jobs.delete_finished_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, %cutoff, "Old sync jobs removed");
        }
        Ok(deleted)
    }
}

/// Whether a type last enqueued at `last` is due again at `now`.
fn is_due(last: Option<DateTime<Utc>>, interval: Duration, now: DateTime<Utc>) -> bool {
    last.is_none_or(|last| now - last >= interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn never_enqueued_is_due() {
        assert!(is_due(None, Duration::minutes(60), at(9, 0)));
    }

    #[test]
    fn due_once_interval_has_elapsed() {
        let interval = Duration::minutes(60);
        assert!(!is_due(Some(at(9, 0)), interval, at(9, 59)));
        assert!(is_due(Some(at(9, 0)), interval, at(10, 0)));
        assert!(is_due(Some(at(9, 0)), interval, at(13, 30)));
    }
}
