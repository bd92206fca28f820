//! Client for the external eVitalRx pharmacy API.
//!
//! [`PharmacyApi`] is the seam the sync engine talks to; [`EvitalRxClient`]
//! is the HTTP implementation.

pub mod client;
pub mod disabled;
pub mod error;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use client::EvitalRxClient;
pub use disabled::DisabledPharmacyApi;
pub use error::PharmacyApiError;
pub use types::{
    ExternalProduct, NewOrder, OrderLine, OrderPage, PharmacyOrder, ProductPage, StockLevel,
};

#[async_trait]
pub trait PharmacyApi: Send + Sync {
    /// One page of the catalogue. Pages start at 1.
    async fn list_products(&self, page: u32, per_page: u32)
    -> Result<ProductPage, PharmacyApiError>;

    async fn get_product(&self, product_id: &str) -> Result<ExternalProduct, PharmacyApiError>;

    async fn search_products(&self, query: &str)
    -> Result<Vec<ExternalProduct>, PharmacyApiError>;

    async fn get_stock_levels(
        &self,
        product_ids: &[String],
    ) -> Result<Vec<StockLevel>, PharmacyApiError>;

    async fn update_stock(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> Result<StockLevel, PharmacyApiError>;

    async fn create_order(&self, order: &NewOrder) -> Result<PharmacyOrder, PharmacyApiError>;

    async fn get_order(&self, order_id: &str) -> Result<PharmacyOrder, PharmacyApiError>;

    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
    ) -> Result<PharmacyOrder, PharmacyApiError>;

    async fn list_orders(
        &self,
        page: u32,
        per_page: u32,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<OrderPage, PharmacyApiError>;
}
