//! HTTP client behaviour against a mocked pharmacy API.

#[path = "test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;

use anyhow::Result;
use care_engine::config::PharmacyApiConfig;
use care_engine::pharmacy::{EvitalRxClient, PharmacyApi, PharmacyApiError};
use care_engine::repositories::MedicineRepository;
use care_engine::sync::JobType;
use care_engine::sync_executor::ExecutionOutcome;
use chrono::TimeZone;
use chrono::Utc;
use serde_json::{Value, json};
use test_utils::{build_state, fixed_clock, monday_utc, setup_test_db_arc};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "pharmacy-test-key";

fn client_for(server: &MockServer) -> EvitalRxClient {
    let config = PharmacyApiConfig {
        base_url: Some(format!("{}/v1", server.uri())),
        api_key: Some(API_KEY.to_string()),
        request_timeout_seconds: 5,
        ..PharmacyApiConfig::default()
    };
    EvitalRxClient::new(&config).expect("client builds")
}

fn product_json(id: &str, mrp: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Medicine {id}"),
        "manufacturer": "Acme Pharma",
        "mrp": mrp,
        "stock_quantity": 12,
        "requires_prescription": false
    })
}

fn products_page(page: u32, total_pages: u32, products: Vec<Value>) -> Value {
    json!({
        "data": {
            "products": products,
            "pagination": {
                "page": page,
                "per_page": 2,
                "total": 3,
                "total_pages": total_pages
            }
        }
    })
}

#[tokio::test]
async fn list_products_sends_key_and_unwraps_envelope() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(header("X-API-Key", API_KEY))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(
            1,
            2,
            vec![product_json("EV-1", 120), product_json("EV-2", 45)],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).list_products(1, 2).await?;

    assert_eq!(page.products.len(), 2);
    assert_eq!(page.products[0].id, "EV-1");
    assert_eq!(page.products[0].manufacturer.as_deref(), Some("Acme Pharma"));
    assert_eq!(page.products[1].mrp.to_string(), "45");
    assert!(page.pagination.has_more());
    Ok(())
}

#[tokio::test]
async fn server_errors_are_transient_and_carry_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"message": "maintenance window"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_products(1, 2)
        .await
        .expect_err("503 fails");

    assert!(err.is_transient());
    assert_eq!(err.status(), Some(503));
    assert!(
        matches!(err, PharmacyApiError::Http { ref message, .. } if message == "maintenance window")
    );
}

#[tokio::test]
async fn rejected_key_is_not_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products/EV-9"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid key"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_product("EV-9")
        .await
        .expect_err("401 fails");

    assert!(!err.is_transient());
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_products(1, 2)
        .await
        .expect_err("html is not json");

    assert!(matches!(err, PharmacyApiError::Malformed(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn stock_levels_post_the_requested_ids() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/stock/levels"))
        .and(body_json(json!({"product_ids": ["EV-1", "EV-2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"product_id": "EV-1", "quantity": 0},
                {"product_id": "EV-2", "quantity": 7, "expiry_date": "2027-03-31"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ids = vec!["EV-1".to_string(), "EV-2".to_string()];
    let levels = client.get_stock_levels(&ids).await?;

    assert_eq!(levels.len(), 2);
    assert!(!levels[0].available());
    assert!(levels[1].available());
    assert!(levels[1].expiry_date.is_some());

    // nothing to ask for, no request
    assert!(client.get_stock_levels(&[]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn list_orders_passes_updated_since_only_when_given() -> Result<()> {
    let server = MockServer::start().await;
    let since = Utc
        .with_ymd_and_hms(2026, 1, 5, 4, 30, 0)
        .single()
        .expect("valid instant");
    let empty_orders = json!({
        "data": {
            "orders": [{
                "order_id": "ORD-1",
                "status": "delivered",
                "updated_at": "2026-01-05T05:00:00Z"
            }],
            "pagination": {"page": 1, "per_page": 50, "total_pages": 1}
        }
    });

    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .and(query_param("updated_since", "2026-01-05T04:30:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_orders.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orders"))
        .and(query_param_is_missing("updated_since"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_orders))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let incremental = client.list_orders(1, 50, Some(since)).await?;
    assert_eq!(incremental.orders[0].id, "ORD-1");
    assert!(!incremental.pagination.has_more());

    let full = client.list_orders(1, 50, None).await?;
    assert_eq!(full.orders.len(), 1);
    Ok(())
}

#[tokio::test]
async fn products_job_stores_every_page_from_the_api() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(
            1,
            2,
            vec![product_json("EV-1", 120), product_json("EV-2", 45)],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products_page(
            2,
            2,
            vec![product_json("EV-3", 300)],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let db = setup_test_db_arc().await?;
    let (_clock, shared) = fixed_clock(monday_utc(4, 30));
    let state = build_state(db.clone(), Arc::new(client_for(&server)), shared);

    let job = state.scheduler.trigger_sync(JobType::Products).await?;
    let outcome = state.scheduler.executor().execute_job(job.id).await?;
    let ExecutionOutcome::Completed(summary) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);

    let medicines = MedicineRepository::new(db);
    let stored = medicines
        .find_by_external_id("EV-3")
        .await?
        .expect("synced medicine");
    assert_eq!(stored.name, "Medicine EV-3");
    assert_eq!(stored.stock_quantity, 12);
    assert_eq!(stored.source, "evitalrx");
    Ok(())
}
