//! Shared helpers for integration tests.
//!
//! In-memory SQLite with migrations applied, a pinned clock, and a scripted
//! stand-in for the pharmacy API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use care_engine::clock::{FixedClock, SharedClock};
use care_engine::config::AppConfig;
use care_engine::pharmacy::{
    ExternalProduct, NewOrder, OrderPage, PharmacyApi, PharmacyApiError, PharmacyOrder,
    ProductPage, StockLevel,
};
use care_engine::pharmacy::types::Pagination;
use care_engine::server::AppState;
use chrono::{DateTime, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use tokio_util::sync::CancellationToken;

pub const OPERATOR_TOKEN: &str = "test-operator-token";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// Monday 2026-01-05 at `hour:minute` UTC.
pub fn monday_utc(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, hour, minute, 0)
        .single()
        .expect("valid test instant")
}

pub fn fixed_clock(at: DateTime<Utc>) -> (FixedClock, SharedClock) {
    let clock = FixedClock::new(at);
    let shared: SharedClock = Arc::new(clock.clone());
    (clock, shared)
}

/// Local profile config with one operator token and small pages.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        profile: "test".to_string(),
        operator_tokens: vec![OPERATOR_TOKEN.to_string()],
        ..AppConfig::default()
    };
    config.pharmacy.page_size = 2;
    config
}

pub fn build_state(
    db: Arc<DatabaseConnection>,
    api: Arc<dyn PharmacyApi>,
    clock: SharedClock,
) -> AppState {
    build_state_with(test_config(), db, api, clock)
}

pub fn build_state_with(
    config: AppConfig,
    db: Arc<DatabaseConnection>,
    api: Arc<dyn PharmacyApi>,
    clock: SharedClock,
) -> AppState {
    AppState::new(
        Arc::new(config),
        db,
        api,
        clock,
        CancellationToken::new(),
    )
}

pub fn product(id: &str, mrp: i64, stock: i64) -> ExternalProduct {
    ExternalProduct {
        id: id.to_string(),
        name: format!("Medicine {id}"),
        manufacturer: Some("Acme Pharma".to_string()),
        category: None,
        composition: None,
        pack_size: Some("10 tablets".to_string()),
        mrp: Decimal::from(mrp),
        selling_price: None,
        stock_quantity: stock,
        requires_prescription: false,
        expiry_date: None,
    }
}

/// Failure to return for a scripted call.
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Network,
    Status(u16),
}

impl Scripted {
    fn error(self) -> PharmacyApiError {
        match self {
            Scripted::Network => PharmacyApiError::Network("connection reset".to_string()),
            Scripted::Status(status) => PharmacyApiError::Http {
                status,
                message: "scripted failure".to_string(),
            },
        }
    }
}

/// Pharmacy API answering from fixed pages and recording every call.
#[derive(Debug, Default)]
pub struct FakePharmacyApi {
    product_pages: Vec<Vec<ExternalProduct>>,
    product_failures: HashMap<u32, Scripted>,
    stock: HashMap<String, i64>,
    stock_failure: Option<Scripted>,
    order_pages: Vec<Vec<PharmacyOrder>>,
    requests: Mutex<Vec<String>>,
}

impl FakePharmacyApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product_pages(mut self, pages: Vec<Vec<ExternalProduct>>) -> Self {
        self.product_pages = pages;
        self
    }

    /// Fail every request for `page`.
    pub fn fail_product_page(mut self, page: u32, failure: Scripted) -> Self {
        self.product_failures.insert(page, failure);
        self
    }

    pub fn with_stock(mut self, product_id: &str, quantity: i64) -> Self {
        self.stock.insert(product_id.to_string(), quantity);
        self
    }

    pub fn fail_stock(mut self, failure: Scripted) -> Self {
        self.stock_failure = Some(failure);
        self
    }

    pub fn with_order_pages(mut self, pages: Vec<Vec<PharmacyOrder>>) -> Self {
        self.order_pages = pages;
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, request: String) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }

    fn pagination(page: u32, per_page: u32, pages: usize, total: usize) -> Pagination {
        Pagination {
            page,
            per_page,
            total: total as u64,
            total_pages: pages as u32,
        }
    }

    fn unsupported(operation: &str) -> PharmacyApiError {
        PharmacyApiError::Configuration(format!("{operation} is not scripted"))
    }
}

#[async_trait]
impl PharmacyApi for FakePharmacyApi {
    async fn list_products(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ProductPage, PharmacyApiError> {
        self.record(format!("products?page={page}"));
        if let Some(failure) = self.product_failures.get(&page) {
            return Err(failure.error());
        }
        let products = self
            .product_pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        let total = self.product_pages.iter().map(Vec::len).sum();
        Ok(ProductPage {
            products,
            pagination: Self::pagination(page, per_page, self.product_pages.len(), total),
        })
    }

    async fn get_product(&self, product_id: &str) -> Result<ExternalProduct, PharmacyApiError> {
        self.record(format!("products/{product_id}"));
        self.product_pages
            .iter()
            .flatten()
            .find(|product| product.id == product_id)
            .cloned()
            .ok_or(PharmacyApiError::Http {
                status: 404,
                message: "not found".to_string(),
            })
    }

    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<ExternalProduct>, PharmacyApiError> {
        self.record(format!("products/search?q={query}"));
        Ok(self
            .product_pages
            .iter()
            .flatten()
            .filter(|product| product.name.contains(query))
            .cloned()
            .collect())
    }

    async fn get_stock_levels(
        &self,
        product_ids: &[String],
    ) -> Result<Vec<StockLevel>, PharmacyApiError> {
        self.record(format!("stock/levels?ids={}", product_ids.join(",")));
        if let Some(failure) = self.stock_failure {
            return Err(failure.error());
        }
        Ok(product_ids
            .iter()
            .filter_map(|id| {
                self.stock.get(id).map(|&quantity| StockLevel {
                    product_id: id.clone(),
                    quantity,
                    is_available: None,
                    expiry_date: None,
                })
            })
            .collect())
    }

    async fn update_stock(
        &self,
        _product_id: &str,
        _quantity: i64,
    ) -> Result<StockLevel, PharmacyApiError> {
        Err(Self::unsupported("update_stock"))
    }

    async fn create_order(&self, _order: &NewOrder) -> Result<PharmacyOrder, PharmacyApiError> {
        Err(Self::unsupported("create_order"))
    }

    async fn get_order(&self, _order_id: &str) -> Result<PharmacyOrder, PharmacyApiError> {
        Err(Self::unsupported("get_order"))
    }

    async fn update_order_status(
        &self,
        _order_id: &str,
        _status: &str,
    ) -> Result<PharmacyOrder, PharmacyApiError> {
        Err(Self::unsupported("update_order_status"))
    }

    async fn list_orders(
        &self,
        page: u32,
        per_page: u32,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<OrderPage, PharmacyApiError> {
        let since = updated_since
            .map(|since| since.to_rfc3339())
            .unwrap_or_default();
        self.record(format!("orders?page={page}&updated_since={since}"));
        let orders = self
            .order_pages
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        let total = self.order_pages.iter().map(Vec::len).sum();
        Ok(OrderPage {
            orders,
            pagination: Self::pagination(page, per_page, self.order_pages.len(), total),
        })
    }
}
