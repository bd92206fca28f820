//! # Serviceability API Handlers
//!
//! Availability, price quotes and capacity for a service in a zone.

use axum::{
    Json,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::parse_service_type;
use crate::auth::OperatorAuth;
use crate::error::{ApiError, validation_error};
use crate::server::AppState;
use crate::zones::{CapacityStatus, OrderDetails, PriceCalculation, ServiceAvailability};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Six digit Indian postal code
    #[param(example = "560001")]
    pub pincode: String,
    /// Service type, e.g. `medicine_delivery`
    #[param(example = "medicine_delivery")]
    pub service_type: String,
}

/// Whether a service is offered at a pincode right now
#[utoipa::path(
    get,
    path = "/api/availability",
    security(("bearer_auth" = [])),
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability verdict", body = ServiceAvailability),
        (status = 400, description = "Malformed pincode or unknown service type", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "serviceability"
)]
pub async fn get_availability(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<ServiceAvailability>, ApiError> {
    let Query(params) = query?;
    let service_type = parse_service_type(&params.service_type)?;
    let availability = state
        .engine
        .get_service_availability(&params.pincode, service_type)
        .await?;
    Ok(Json(availability))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct QuoteRequest {
    pub zone_id: Uuid,
    #[schema(example = "medicine_delivery")]
    pub service_type: String,
    pub order: OrderDetails,
}

/// Price an order for a service in a zone at the current local time
#[utoipa::path(
    post,
    path = "/api/pricing/quote",
    security(("bearer_auth" = [])),
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Price with itemised adjustments", body = PriceCalculation),
        (status = 400, description = "Invalid order or service type", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Service not configured in the zone", body = ApiError)
    ),
    tag = "serviceability"
)]
pub async fn quote_price(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<PriceCalculation>, ApiError> {
    let Json(request) = body?;
    let service_type = parse_service_type(&request.service_type)?;
    let quote = state
        .engine
        .calculate_dynamic_price(request.zone_id, service_type, &request.order)
        .await?;
    Ok(Json(quote))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CapacityParams {
    pub zone_id: String,
    pub service_type: String,
    /// Requested time (RFC3339); defaults to now
    pub at: Option<String>,
}

/// Free slots in the hour containing `at`
#[utoipa::path(
    get,
    path = "/api/capacity",
    security(("bearer_auth" = [])),
    params(CapacityParams),
    responses(
        (status = 200, description = "Capacity for the requested hour", body = CapacityStatus),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Service not configured in the zone", body = ApiError)
    ),
    tag = "serviceability"
)]
pub async fn get_capacity(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    query: Result<Query<CapacityParams>, QueryRejection>,
) -> Result<Json<CapacityStatus>, ApiError> {
    let Query(params) = query?;
    let zone_id = Uuid::parse_str(&params.zone_id).map_err(|_| {
        validation_error("Invalid zone_id", json!({ "zone_id": "Must be a valid UUID" }))
    })?;
    let service_type = parse_service_type(&params.service_type)?;
    let requested = match params.at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|at| at.to_utc())
            .map_err(|_| {
                validation_error(
                    "Invalid at format",
                    json!({ "at": "Must be an RFC3339 timestamp" }),
                )
            })?,
        None => state.clock.now(),
    };

    let status = state
        .engine
        .check_service_capacity(zone_id, service_type, requested)
        .await?;
    Ok(Json(status))
}
