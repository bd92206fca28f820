//! Catalogue sync: page through the pharmacy's products and upsert each one
//! locally by its external id.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::Set;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{JobType, RunTally, SyncError, SyncOutcome, SyncRunner};
use crate::db::to_db_time;
use crate::models::medicine::{ActiveModel, SOURCE_EVITALRX};
use crate::pharmacy::ExternalProduct;

/// Local row for `product`, or why it cannot be stored.
pub fn medicine_from_product(
    product: &ExternalProduct,
    now: DateTime<Utc>,
) -> Result<ActiveModel, String> {
    if product.id.trim().is_empty() {
        return Err("product has no id".to_string());
    }
    if product.name.trim().is_empty() {
        return Err(format!("product {} has no name", product.id));
    }
    if product.mrp.is_sign_negative() {
        return Err(format!("product {} has a negative mrp", product.id));
    }
    let mrp = product
        .mrp
        .to_f64()
        .ok_or_else(|| format!("product {} mrp out of range", product.id))?;
    let selling_price = match product.selling_price {
        Some(price) => price
            .to_f64()
            .ok_or_else(|| format!("product {} selling price out of range", product.id))?,
        None => mrp,
    };
    let stock_quantity = i32::try_from(product.stock_quantity.max(0))
        .map_err(|_| format!("product {} stock quantity out of range", product.id))?;

    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        external_product_id: Set(Some(product.id.clone())),
        name: Set(product.name.trim().to_string()),
        manufacturer: Set(product.manufacturer.clone()),
        category: Set(product.category.clone()),
        composition: Set(product.composition.clone()),
        pack_size: Set(product.pack_size.clone()),
        mrp: Set(mrp),
        selling_price: Set(selling_price),
        stock_quantity: Set(stock_quantity),
        is_available: Set(stock_quantity > 0),
        expiry_date: Set(product.expiry_date),
        requires_prescription: Set(product.requires_prescription),
        source: Set(SOURCE_EVITALRX.to_string()),
        last_synced_at: Set(Some(to_db_time(now))),
        created_at: Set(to_db_time(now)),
        updated_at: Set(to_db_time(now)),
    })
}

impl SyncRunner {
    /// Pull the whole catalogue page by page, in order.
    ///
    /// A product that cannot be stored is counted as failed and skipped. A
    /// page that cannot be fetched ends the run; see `abort_run` for how the
    /// outcome is decided.
    #[instrument(skip(self))]
    pub async fn sync_products(&self, job_id: Option<Uuid>) -> Result<SyncOutcome, SyncError> {
        let log = self.logs.start(job_id, JobType::Products, self.now()).await?;
        let mut tally = RunTally::default();
        let mut page = 1;

        loop {
            if self.shutdown.is_cancelled() {
                return self
                    .abort_run(log.id, JobType::Products, tally, SyncError::Cancelled)
                    .await;
            }

            let batch = match self.api.list_products(page, self.page_size).await {
                Ok(batch) => batch,
                Err(err) => {
                    return self
                        .abort_run(log.id, JobType::Products, tally, err.into())
                        .await;
                }
            };

            let now = self.now();
            for product in &batch.products {
                let stored = match medicine_from_product(product, now) {
                    Ok(model) => self
                        .medicines
                        .upsert_external(model)
                        .await
                        .map_err(|err| err.to_string()),
                    Err(reason) => Err(reason),
                };
                match stored {
                    Ok(()) => tally.processed += 1,
                    Err(reason) => {
                        tally.failed += 1;
                        warn!(product_id = %product.id, %reason, "Skipping product");
                    }
                }
            }

            self.logs
                .record_progress(log.id, tally.total(), tally.processed, tally.failed)
                .await?;
            debug!(
                page,
                received = batch.products.len(),
                processed = tally.processed,
                failed = tally.failed,
                "Product page synced"
            );

            if batch.products.is_empty() || !batch.pagination.has_more() {
                break;
            }
            page += 1;
        }

        self.finish_run(log.id, JobType::Products, tally).await
    }
}
