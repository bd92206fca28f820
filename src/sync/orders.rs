//! Order status sync.
//!
//! There is no local order table; the run pages through orders the pharmacy
//! changed since the last good run and records how many it saw.

use tracing::{debug, instrument};
use uuid::Uuid;

use super::{JobType, RunTally, SyncError, SyncOutcome, SyncRunner};

impl SyncRunner {
    #[instrument(skip(self))]
    pub async fn sync_orders(&self, job_id: Option<Uuid>) -> Result<SyncOutcome, SyncError> {
        let since = self
            .logs
            .last_completed(JobType::Orders)
            .await?
            .map(|log| log.started_at.to_utc());
        let log = self.logs.start(job_id, JobType::Orders, self.now()).await?;
        let mut tally = RunTally::default();
        let mut page = 1;

        loop {
            if self.shutdown.is_cancelled() {
                return self
                    .abort_run(log.id, JobType::Orders, tally, SyncError::Cancelled)
                    .await;
            }

            let batch = match self.api.list_orders(page, self.page_size, since).await {
                Ok(batch) => batch,
                Err(err) => {
                    return self
                        .abort_run(log.id, JobType::Orders, tally, err.into())
                        .await;
                }
            };

            for order in &batch.orders {
                if order.id.trim().is_empty() || order.status.trim().is_empty() {
                    tally.failed += 1;
                } else {
                    tally.processed += 1;
                    debug!(order_id = %order.id, status = %order.status, "Order status observed");
                }
            }

            self.logs
                .record_progress(log.id, tally.total(), tally.processed, tally.failed)
                .await?;

            if batch.orders.is_empty() || !batch.pagination.has_more() {
                break;
            }
            page += 1;
        }

        self.finish_run(log.id, JobType::Orders, tally).await
    }
}
