//! Router-level tests: auth, serviceability endpoints and sync admin.

#[path = "test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use care_engine::clock::FixedClock;
use care_engine::repositories::PincodeZoneRepository;
use care_engine::server::create_app;
use care_engine::zones::defaults::default_template;
use care_engine::zones::{ClockTime, DaySchedule, OperatingHours, ServiceSettings, ServiceType};
use chrono::Weekday;
use rust_decimal::{Decimal, dec};
use serde_json::{Value, json};
use test_utils::{
    FakePharmacyApi, OPERATOR_TOKEN, build_state, fixed_clock, monday_utc, setup_test_db_arc,
};
use tower::ServiceExt;
use uuid::Uuid;

const PINCODE: &str = "560001";

struct TestApp {
    router: Router,
    clock: FixedClock,
    zone_id: Uuid,
}

/// Router over a fresh database with one mapped pincode, Monday 10:00 IST.
async fn test_app() -> Result<TestApp> {
    let db = setup_test_db_arc().await?;
    let (clock, shared) = fixed_clock(monday_utc(4, 30));
    let zone_id = Uuid::new_v4();
    PincodeZoneRepository::new(db.clone())
        .upsert(PINCODE, zone_id, Some("Bengaluru".to_string()), true)
        .await?;
    let state = build_state(db, Arc::new(FakePharmacyApi::new()), shared);

    Ok(TestApp {
        router: create_app(state),
        clock,
        zone_id,
    })
}

fn delivery_settings() -> ServiceSettings {
    let mut settings = default_template(ServiceType::MedicineDelivery).settings;
    settings.is_enabled = true;
    settings.delivery_fee = dec!(50);
    settings.peak_hour_multiplier = dec!(1.2);
    settings.distance_based_pricing = false;
    settings.operating_hours = OperatingHours::default().with_day(
        Weekday::Mon,
        DaySchedule::new(
            ClockTime::hm(8, 0).expect("08:00"),
            ClockTime::hm(22, 0).expect("22:00"),
        ),
    );
    settings
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {OPERATOR_TOKEN}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
}

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let app = test_app().await?;

    let request = Request::builder().uri("/healthz").body(Body::empty())?;
    let (status, body) = send(&app.router, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    let request = Request::builder().uri("/").body(Body::empty())?;
    let (status, _) = send(&app.router, request).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_routes_require_an_operator_token() -> Result<()> {
    let app = test_app().await?;

    let request = Request::builder()
        .uri("/api/sync/settings")
        .header("x-request-id", "req-auth-1")
        .body(Body::empty())?;
    let (status, body) = send(&app.router, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["trace_id"], "req-auth-1");

    let request = Request::builder()
        .uri("/api/sync/settings")
        .header(header::AUTHORIZATION, "Bearer not-the-token")
        .body(Body::empty())?;
    let (status, _) = send(&app.router, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn zone_service_lifecycle_over_http() -> Result<()> {
    let app = test_app().await?;
    let uri = format!("/api/zones/{}/services/medicine_delivery", app.zone_id);

    let (status, _) = send(&app.router, authed("GET", &uri, None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let settings = serde_json::to_value(delivery_settings())?;
    let (status, stored) = send(&app.router, authed("PUT", &uri, Some(settings))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["service_type"], "medicine_delivery");
    assert_eq!(stored["is_enabled"], true);

    let (status, listed) = send(
        &app.router,
        authed("GET", &format!("/api/zones/{}/services", app.zone_id), None),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, toggled) = send(
        &app.router,
        authed("POST", &format!("{uri}/toggle"), Some(json!({"enabled": false}))),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["is_enabled"], false);

    let (status, _) = send(&app.router, authed("DELETE", &uri, None)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app.router, authed("DELETE", &uri, None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CONFIG_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn availability_and_quote_for_a_configured_zone() -> Result<()> {
    let app = test_app().await?;
    let uri = format!("/api/zones/{}/services/medicine_delivery", app.zone_id);
    let settings = serde_json::to_value(delivery_settings())?;
    let (status, _) = send(&app.router, authed("PUT", &uri, Some(settings))).await?;
    assert_eq!(status, StatusCode::OK);

    let availability = format!("/api/availability?pincode={PINCODE}&service_type=medicine_delivery");
    let (status, body) = send(&app.router, authed("GET", &availability, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);
    assert_eq!(body["zone_id"], app.zone_id.to_string());

    // 23:00 IST is after closing
    app.clock.set(monday_utc(17, 30));
    let (_, body) = send(&app.router, authed("GET", &availability, None)).await?;
    assert_eq!(body["available"], false);
    app.clock.set(monday_utc(4, 30));

    let quote = json!({
        "zone_id": app.zone_id,
        "service_type": "medicine_delivery",
        "order": {"order_value": "1000"}
    });
    let (status, body) = send(&app.router, authed("POST", "/api/pricing/quote", Some(quote))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["final_price"]), dec!(1050));
    assert_eq!(decimal(&body["savings"]), Decimal::ZERO);

    let oversized = json!({
        "zone_id": app.zone_id,
        "service_type": "medicine_delivery",
        "order": {"order_value": Decimal::MAX.to_string()}
    });
    let (status, body) =
        send(&app.router, authed("POST", "/api/pricing/quote", Some(oversized))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    Ok(())
}

#[tokio::test]
async fn malformed_inputs_are_validation_errors() -> Result<()> {
    let app = test_app().await?;

    let (status, body) = send(
        &app.router,
        authed(
            "GET",
            "/api/availability?pincode=56A001&service_type=medicine_delivery",
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, _) = send(
        &app.router,
        authed(
            "GET",
            &format!("/api/availability?pincode={PINCODE}&service_type=teleportation"),
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        authed(
            "GET",
            "/api/capacity?zone_id=not-a-uuid&service_type=medicine_delivery",
            None,
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        authed(
            "POST",
            "/api/pricing/quote",
            Some(json!({"zone_id": app.zone_id, "service_type": "medicine_delivery"})),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, body) = send(
        &app.router,
        authed("GET", "/api/service-types/diagnostics/defaults", None),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service_type"], "diagnostics");
    Ok(())
}

#[tokio::test]
async fn sync_jobs_can_be_triggered_listed_and_cancelled() -> Result<()> {
    let app = test_app().await?;

    let (status, job) = send(
        &app.router,
        authed("POST", "/api/sync/jobs", Some(json!({"job_type": "stock"}))),
    )
    .await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["status"], "pending");
    let job_id = job["id"].as_str().expect("job id").to_string();

    let (status, _) = send(
        &app.router,
        authed("POST", "/api/sync/jobs", Some(json!({"job_type": "invoices"}))),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = send(
        &app.router,
        authed("GET", "/api/sync/jobs?job_type=stock&status=pending", None),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let cancel = format!("/api/sync/jobs/{job_id}/cancel");
    let (status, cancelled) = send(&app.router, authed("POST", &cancel, None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "failed");

    let (status, body) = send(&app.router, authed("POST", &cancel, None)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "JOB_NOT_PENDING");

    let (status, _) = send(
        &app.router,
        authed("GET", &format!("/api/sync/jobs/{}", Uuid::new_v4()), None),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, logs) = send(&app.router, authed("GET", "/api/sync/logs", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn sync_settings_round_trip_through_the_api() -> Result<()> {
    let app = test_app().await?;

    let (status, settings) = send(&app.router, authed("GET", "/api/sync/settings", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["enabled"], true);
    assert_eq!(settings["interval_minutes"], 60);

    let (status, updated) = send(
        &app.router,
        authed(
            "PUT",
            "/api/sync/settings",
            Some(json!({"interval_minutes": 30, "job_types": ["orders"]})),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["interval_minutes"], 30);
    assert_eq!(updated["job_types"], json!(["orders"]));

    let (status, body) = send(
        &app.router,
        authed(
            "PUT",
            "/api/sync/settings",
            Some(json!({"interval_minutes": 0})),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    Ok(())
}
