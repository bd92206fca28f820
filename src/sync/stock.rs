//! Stock sync: refresh quantity, availability and expiry for every product
//! that came from the pharmacy.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{JobType, RunTally, SyncError, SyncOutcome, SyncRunner};
use crate::pharmacy::StockLevel;

impl SyncRunner {
    /// Ask the pharmacy for stock of every locally synced product, in chunks
    /// of `page_size` ids. An id the pharmacy does not answer for counts as
    /// failed.
    #[instrument(skip(self))]
    pub async fn sync_stock_levels(
        &self,
        job_id: Option<Uuid>,
    ) -> Result<SyncOutcome, SyncError> {
        let log = self.logs.start(job_id, JobType::Stock, self.now()).await?;
        let ids = match self.medicines.external_product_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                return self
                    .abort_run(log.id, JobType::Stock, RunTally::default(), err.into())
                    .await;
            }
        };
        let mut tally = RunTally::default();
        let chunk_size = usize::try_from(self.page_size).unwrap_or(usize::MAX);

        for chunk in ids.chunks(chunk_size) {
            if self.shutdown.is_cancelled() {
                return self
                    .abort_run(log.id, JobType::Stock, tally, SyncError::Cancelled)
                    .await;
            }

            let levels = match self.api.get_stock_levels(chunk).await {
                Ok(levels) => levels,
                Err(err) => {
                    return self
                        .abort_run(log.id, JobType::Stock, tally, err.into())
                        .await;
                }
            };
            let mut by_id: HashMap<&str, &StockLevel> = levels
                .iter()
                .map(|level| (level.product_id.as_str(), level))
                .collect();

            let now = self.now();
            for product_id in chunk {
                let Some(level) = by_id.remove(product_id.as_str()) else {
                    tally.failed += 1;
                    warn!(product_id = %product_id, "No stock reading returned");
                    continue;
                };
                let Ok(quantity) = i32::try_from(level.quantity.max(0)) else {
                    tally.failed += 1;
                    warn!(
                        product_id = %product_id,
                        quantity = level.quantity,
                        "Stock quantity out of range"
                    );
                    continue;
                };
                match self
                    .medicines
                    .apply_stock(product_id, quantity, level.available(), level.expiry_date, now)
                    .await
                {
                    Ok(true) => tally.processed += 1,
                    Ok(false) => {
                        tally.failed += 1;
                        warn!(product_id = %product_id, "Product disappeared before stock update");
                    }
                    Err(err) => {
                        tally.failed += 1;
                        warn!(product_id = %product_id, error = %err, "Stock update failed");
                    }
                }
            }

            self.logs
                .record_progress(log.id, tally.total(), tally.processed, tally.failed)
                .await?;
            debug!(
                requested = chunk.len(),
                returned = levels.len(),
                processed = tally.processed,
                failed = tally.failed,
                "Stock chunk synced"
            );
        }

        self.finish_run(log.id, JobType::Stock, tally).await
    }
}
