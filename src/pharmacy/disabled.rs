//! Stand-in used when no API key is configured. Every call fails with a
//! configuration error, which the sync engine never retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ExternalProduct, NewOrder, OrderPage, PharmacyApi, PharmacyApiError, PharmacyOrder,
    ProductPage, StockLevel,
};

#[derive(Debug, Clone, Default)]
pub struct DisabledPharmacyApi;

fn not_configured<T>() -> Result<T, PharmacyApiError> {
    Err(PharmacyApiError::Configuration(
        "pharmacy api key is not set".to_string(),
    ))
}

#[async_trait]
impl PharmacyApi for DisabledPharmacyApi {
    async fn list_products(&self, _: u32, _: u32) -> Result<ProductPage, PharmacyApiError> {
        not_configured()
    }

    async fn get_product(&self, _: &str) -> Result<ExternalProduct, PharmacyApiError> {
        not_configured()
    }

    async fn search_products(&self, _: &str) -> Result<Vec<ExternalProduct>, PharmacyApiError> {
        not_configured()
    }

    async fn get_stock_levels(&self, _: &[String]) -> Result<Vec<StockLevel>, PharmacyApiError> {
        not_configured()
    }

    async fn update_stock(&self, _: &str, _: i64) -> Result<StockLevel, PharmacyApiError> {
        not_configured()
    }

    async fn create_order(&self, _: &NewOrder) -> Result<PharmacyOrder, PharmacyApiError> {
        not_configured()
    }

    async fn get_order(&self, _: &str) -> Result<PharmacyOrder, PharmacyApiError> {
        not_configured()
    }

    async fn update_order_status(
        &self,
        _: &str,
        _: &str,
    ) -> Result<PharmacyOrder, PharmacyApiError> {
        not_configured()
    }

    async fn list_orders(
        &self,
        _: u32,
        _: u32,
        _: Option<DateTime<Utc>>,
    ) -> Result<OrderPage, PharmacyApiError> {
        not_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_is_a_configuration_error() {
        let api = DisabledPharmacyApi;
        let err = api.list_products(1, 50).await.unwrap_err();
        assert!(matches!(err, PharmacyApiError::Configuration(_)));
        assert!(!err.is_transient());
    }
}
