//! Local medicine catalogue, as far as the sync engine touches it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::db::to_db_time;
use crate::models::medicine::{ActiveModel, Column, Entity as Medicine, Model, SOURCE_EVITALRX};

#[derive(Debug, Clone)]
pub struct MedicineRepository {
    db: Arc<DatabaseConnection>,
}

impl MedicineRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert or overwrite the row with the same `external_product_id`.
    ///
    /// A product seen again keeps its local `id` and `created_at`.
    pub async fn upsert_external(&self, model: ActiveModel) -> Result<(), DbErr> {
        Medicine::insert(model)
            .on_conflict(
                OnConflict::column(Column::ExternalProductId)
                    .update_columns([
                        Column::Name,
                        Column::Manufacturer,
                        Column::Category,
                        Column::Composition,
                        Column::PackSize,
                        Column::Mrp,
                        Column::SellingPrice,
                        Column::StockQuantity,
                        Column::IsAvailable,
                        Column::ExpiryDate,
                        Column::RequiresPrescription,
                        Column::Source,
                        Column::LastSyncedAt,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Model>, DbErr> {
        Medicine::find()
            .filter(Column::ExternalProductId.eq(external_id))
            .one(self.db.as_ref())
            .await
    }

    /// External ids of every product that came from the pharmacy.
    pub async fn external_product_ids(&self) -> Result<Vec<String>, DbErr> {
        let ids: Vec<Option<String>> = Medicine::find()
            .select_only()
            .column(Column::ExternalProductId)
            .filter(Column::Source.eq(SOURCE_EVITALRX))
            .filter(Column::ExternalProductId.is_not_null())
            .order_by_asc(Column::ExternalProductId)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;
        Ok(ids.into_iter().flatten().collect())
    }

    /// Apply a stock reading. Returns false when no synced product matches.
    pub async fn apply_stock(
        &self,
        external_id: &str,
        quantity: i32,
        is_available: bool,
        expiry_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let mut update = Medicine::update_many()
            .col_expr(Column::StockQuantity, Expr::value(quantity))
            .col_expr(Column::IsAvailable, Expr::value(is_available))
            .col_expr(Column::LastSyncedAt, Expr::value(to_db_time(now)))
            .col_expr(Column::UpdatedAt, Expr::value(to_db_time(now)));
        if let Some(expiry_date) = expiry_date {
            update = update.col_expr(Column::ExpiryDate, Expr::value(expiry_date));
        }

        let result = update
            .filter(Column::ExternalProductId.eq(external_id))
            .filter(Column::Source.eq(SOURCE_EVITALRX))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
