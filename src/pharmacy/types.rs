//! Wire types for the pharmacy API.
//!
//! Every response is wrapped in an envelope with a `data` payload. Product
//! and order listings are paginated with 1-based page numbers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalProduct {
    #[serde(alias = "product_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub pack_size: Option<String>,
    pub mrp: Decimal,
    #[serde(default)]
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<ExternalProduct>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl StockLevel {
    /// Explicit flag when sent, otherwise "anything on the shelf".
    pub fn available(&self) -> bool {
        self.is_available.unwrap_or(self.quantity > 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub patient_name: String,
    pub mobile: String,
    pub delivery_address: String,
    pub items: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacyOrder {
    #[serde(alias = "order_id")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<PharmacyOrder>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StockQuery<'a> {
    pub product_ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StockUpdate {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusUpdate<'a> {
    pub status: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_accepts_numeric_prices_and_product_id_alias() {
        let product: ExternalProduct = serde_json::from_value(json!({
            "product_id": "EV-100",
            "name": "Paracetamol 500mg",
            "mrp": 25.5,
            "selling_price": "22.00",
            "expiry_date": "2027-03-31"
        }))
        .unwrap();

        assert_eq!(product.id, "EV-100");
        assert_eq!(product.mrp, Decimal::new(255, 1));
        assert_eq!(product.selling_price, Some(Decimal::new(22, 0)));
        assert_eq!(product.stock_quantity, 0);
        assert!(!product.requires_prescription);
    }

    #[test]
    fn stock_availability_falls_back_to_quantity() {
        let level = StockLevel {
            product_id: "EV-1".into(),
            quantity: 0,
            is_available: None,
            expiry_date: None,
        };
        assert!(!level.available());

        let level = StockLevel {
            quantity: 0,
            is_available: Some(true),
            ..level
        };
        assert!(level.available());
    }
}
