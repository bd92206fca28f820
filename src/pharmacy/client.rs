//! HTTP implementation of [`PharmacyApi`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::types::{Envelope, StatusUpdate, StockQuery, StockUpdate};
use super::{
    ExternalProduct, NewOrder, OrderPage, PharmacyApi, PharmacyApiError, PharmacyOrder,
    ProductPage, StockLevel,
};
use crate::config::PharmacyApiConfig;

const API_KEY_HEADER: &str = "X-API-Key";
const USER_AGENT: &str = "care-engine/0.1";
const MAX_ERROR_SNIPPET: usize = 200;

#[derive(Debug, Clone)]
pub struct EvitalRxClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl EvitalRxClient {
    pub fn new(config: &PharmacyApiConfig) -> Result<Self, PharmacyApiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PharmacyApiError::Configuration("api key is not set".to_string()))?;

        let mut raw_base = config.effective_base_url().to_string();
        if !raw_base.ends_with('/') {
            raw_base.push('/');
        }
        let base_url = Url::parse(&raw_base)
            .map_err(|err| PharmacyApiError::Configuration(format!("base url: {err}")))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, PharmacyApiError> {
        self.base_url
            .join(path)
            .map_err(|err| PharmacyApiError::Configuration(format!("endpoint {path}: {err}")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PharmacyApiError> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let url = response.url().path().to_string();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            warn!(status = status.as_u16(), path = %url, %message, "Pharmacy API request failed");
            return Err(PharmacyApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        debug!(path = %url, bytes = body.len(), "Pharmacy API response received");
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|err| PharmacyApiError::Malformed(format!("{url}: {err}")))?;
        Ok(envelope.data)
    }
}

/// Message from a JSON `message` or `error` field, else a trimmed body snippet.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(serde_json::Value::String(message)) = map.get(key)
                && !message.is_empty()
            {
                return message.clone();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_SNIPPET).collect()
}

#[async_trait]
impl PharmacyApi for EvitalRxClient {
    async fn list_products(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<ProductPage, PharmacyApiError> {
        let url = self.endpoint("products")?;
        self.send(
            self.http
                .get(url)
                .query(&[("page", page), ("per_page", per_page)]),
        )
        .await
    }

    async fn get_product(&self, product_id: &str) -> Result<ExternalProduct, PharmacyApiError> {
        let url = self.endpoint(&format!("products/{product_id}"))?;
        self.send(self.http.get(url)).await
    }

    async fn search_products(
        &self,
        query: &str,
    ) -> Result<Vec<ExternalProduct>, PharmacyApiError> {
        let url = self.endpoint("products/search")?;
        self.send(self.http.get(url).query(&[("q", query)])).await
    }

    async fn get_stock_levels(
        &self,
        product_ids: &[String],
    ) -> Result<Vec<StockLevel>, PharmacyApiError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint("stock/levels")?;
        self.send(self.http.post(url).json(&StockQuery { product_ids }))
            .await
    }

    async fn update_stock(
        &self,
        product_id: &str,
        quantity: i64,
    ) -> Result<StockLevel, PharmacyApiError> {
        let url = self.endpoint(&format!("stock/{product_id}"))?;
        self.send(self.http.put(url).json(&StockUpdate { quantity }))
            .await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<PharmacyOrder, PharmacyApiError> {
        let url = self.endpoint("orders")?;
        self.send(self.http.post(url).json(order)).await
    }

    async fn get_order(&self, order_id: &str) -> Result<PharmacyOrder, PharmacyApiError> {
        let url = self.endpoint(&format!("orders/{order_id}"))?;
        self.send(self.http.get(url)).await
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
    ) -> Result<PharmacyOrder, PharmacyApiError> {
        let url = self.endpoint(&format!("orders/{order_id}/status"))?;
        self.send(self.http.put(url).json(&StatusUpdate { status }))
            .await
    }

    async fn list_orders(
        &self,
        page: u32,
        per_page: u32,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<OrderPage, PharmacyApiError> {
        let mut url = self.endpoint("orders")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &per_page.to_string());
            if let Some(since) = updated_since {
                query.append_pair(
                    "updated_since",
                    &since.to_rfc3339_opts(SecondsFormat::Secs, true),
                );
            }
        }
        self.send(self.http.get(url)).await
    }
}
