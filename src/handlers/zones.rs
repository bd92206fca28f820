//! # Zone Service Configuration Handlers
//!
//! Operator endpoints for provisioning and tuning services per zone.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::parse_service_type;
use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::server::AppState;
use crate::zones::{
    BulkConfigureOutcome, EngineError, ServiceSettings, ServiceType, ZoneServiceConfig,
    ZoneServiceConfigTemplate,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkConfigureRequest {
    #[schema(example = json!(["medicine_delivery", "diagnostics"]))]
    pub service_types: Vec<String>,
}

/// Every configured service in a zone
#[utoipa::path(
    get,
    path = "/api/zones/{zone_id}/services",
    security(("bearer_auth" = [])),
    params(("zone_id" = Uuid, Path, description = "Zone identifier")),
    responses(
        (status = 200, description = "Zone service configurations", body = [ZoneServiceConfig]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn list_zone_services(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(zone_id): Path<Uuid>,
) -> Result<Json<Vec<ZoneServiceConfig>>, ApiError> {
    Ok(Json(state.engine.list_zone_services(zone_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/zones/{zone_id}/services/{service_type}",
    security(("bearer_auth" = [])),
    params(
        ("zone_id" = Uuid, Path, description = "Zone identifier"),
        ("service_type" = String, Path, description = "Service type")
    ),
    responses(
        (status = 200, description = "Zone service configuration", body = ZoneServiceConfig),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Service not configured in the zone", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn get_zone_service(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path((zone_id, service_type)): Path<(Uuid, String)>,
) -> Result<Json<ZoneServiceConfig>, ApiError> {
    let service_type = parse_service_type(&service_type)?;
    let config = state
        .engine
        .get_zone_service_config(zone_id, service_type)
        .await?
        .ok_or(EngineError::ConfigNotFound {
            zone_id,
            service_type,
        })?;
    Ok(Json(config))
}

/// Create or replace the configuration of a service in a zone
#[utoipa::path(
    put,
    path = "/api/zones/{zone_id}/services/{service_type}",
    security(("bearer_auth" = [])),
    params(
        ("zone_id" = Uuid, Path, description = "Zone identifier"),
        ("service_type" = String, Path, description = "Service type")
    ),
    request_body = ServiceSettings,
    responses(
        (status = 200, description = "Stored configuration", body = ZoneServiceConfig),
        (status = 400, description = "Invalid configuration", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn put_zone_service(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path((zone_id, service_type)): Path<(Uuid, String)>,
    body: Result<Json<ServiceSettings>, JsonRejection>,
) -> Result<Json<ZoneServiceConfig>, ApiError> {
    let Json(settings) = body?;
    let service_type = parse_service_type(&service_type)?;
    let stored = state
        .engine
        .upsert_zone_service_config(zone_id, service_type, settings)
        .await?;
    Ok(Json(stored))
}

#[utoipa::path(
    delete,
    path = "/api/zones/{zone_id}/services/{service_type}",
    security(("bearer_auth" = [])),
    params(
        ("zone_id" = Uuid, Path, description = "Zone identifier"),
        ("service_type" = String, Path, description = "Service type")
    ),
    responses(
        (status = 204, description = "Configuration deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Service not configured in the zone", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn delete_zone_service(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path((zone_id, service_type)): Path<(Uuid, String)>,
) -> Result<StatusCode, ApiError> {
    let service_type = parse_service_type(&service_type)?;
    state
        .engine
        .delete_zone_service_config(zone_id, service_type)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Enable or disable a configured service without touching its settings
#[utoipa::path(
    post,
    path = "/api/zones/{zone_id}/services/{service_type}/toggle",
    security(("bearer_auth" = [])),
    params(
        ("zone_id" = Uuid, Path, description = "Zone identifier"),
        ("service_type" = String, Path, description = "Service type")
    ),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Updated configuration", body = ZoneServiceConfig),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Service not configured in the zone", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn toggle_zone_service(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path((zone_id, service_type)): Path<(Uuid, String)>,
    body: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ZoneServiceConfig>, ApiError> {
    let Json(request) = body?;
    let service_type = parse_service_type(&service_type)?;
    let updated = state
        .engine
        .set_service_enabled(zone_id, service_type, request.enabled)
        .await?;
    Ok(Json(updated))
}

/// Provision several services in a zone from their default templates
#[utoipa::path(
    post,
    path = "/api/zones/{zone_id}/services/bulk",
    security(("bearer_auth" = [])),
    params(("zone_id" = Uuid, Path, description = "Zone identifier")),
    request_body = BulkConfigureRequest,
    responses(
        (status = 200, description = "Configured and failed service types", body = BulkConfigureOutcome),
        (status = 400, description = "Unknown service type", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn bulk_configure(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(zone_id): Path<Uuid>,
    body: Result<Json<BulkConfigureRequest>, JsonRejection>,
) -> Result<Json<BulkConfigureOutcome>, ApiError> {
    let Json(request) = body?;
    let service_types = request
        .service_types
        .iter()
        .map(|raw| parse_service_type(raw))
        .collect::<Result<Vec<ServiceType>, ApiError>>()?;
    let outcome = state
        .engine
        .bulk_configure_zone_services(zone_id, &service_types)
        .await;
    Ok(Json(outcome))
}

/// Built in template for a service type
#[utoipa::path(
    get,
    path = "/api/service-types/{service_type}/defaults",
    security(("bearer_auth" = [])),
    params(("service_type" = String, Path, description = "Service type")),
    responses(
        (status = 200, description = "Default configuration", body = ZoneServiceConfigTemplate),
        (status = 400, description = "Unknown service type", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError)
    ),
    tag = "zones"
)]
pub async fn get_service_defaults(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(service_type): Path<String>,
) -> Result<Json<ZoneServiceConfigTemplate>, ApiError> {
    let service_type = parse_service_type(&service_type)?;
    Ok(Json(state.engine.get_default_service_config(service_type)))
}
