//! # Error Handling
//!
//! Unified problem+json error responses for the care engine HTTP surface,
//! with trace ID propagation and mappers from the domain error types.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::pharmacy::PharmacyApiError;
use crate::sync::SyncError;
use crate::telemetry;
use crate::zones::EngineError;

/// Problem+json error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code (not serialized, used for the response status)
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Stable machine-readable error code (e.g. CONFIG_NOT_FOUND)
    pub code: Box<str>,
    /// Human-readable message
    pub message: Box<str>,
    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Seconds after which the client may retry
    pub retry_after: Option<u64>,
    /// Trace or correlation id for log lookup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // No request span: fall back to a short correlation id
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// True when the database rejected a write because of a unique index.
pub(crate) fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code_str = code.as_ref();
        code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str)
    })
}

/// Details attached to errors caused by the external pharmacy API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpstreamError {
    pub upstream: String,
    pub status: Option<u16>,
    pub message_snippet: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            &format!("Invalid query string: {}", rejection.body_text()),
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
                .with_retry_after(5)
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::ConfigNotFound {
                zone_id,
                service_type,
            } => Self::new(
                StatusCode::NOT_FOUND,
                "CONFIG_NOT_FOUND",
                &format!("No configuration for {service_type} in zone {zone_id}"),
            )
            .with_details(json!({
                "zone_id": zone_id,
                "service_type": service_type.as_str(),
            })),
            EngineError::InvalidConfig(message) => validation_error(
                "Invalid zone service configuration",
                json!({ "config": message }),
            ),
            EngineError::UnknownServiceType(value) => validation_error(
                "Unknown service type",
                json!({ "service_type": format!("'{value}' is not a known service type") }),
            ),
            EngineError::InvalidOrder(message) => {
                validation_error("Invalid order details", json!({ "order": message }))
            }
            EngineError::InvalidPincode(value) => validation_error(
                "Invalid pincode",
                json!({ "pincode": format!("'{value}' must be six digits") }),
            ),
            EngineError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<PharmacyApiError> for ApiError {
    fn from(error: PharmacyApiError) -> Self {
        let status = match &error {
            PharmacyApiError::Http { status, .. } => Some(*status),
            _ => None,
        };
        upstream_error("evitalrx", status, Some(error.to_string()))
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Api(api_err) => api_err.into(),
            SyncError::Database(db_err) => db_err.into(),
            SyncError::UnknownJobType(value) => validation_error(
                "Unknown job type",
                json!({ "job_type": format!("'{value}' is not a known job type") }),
            ),
            SyncError::JobNotFound(job_id) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Sync job {job_id} not found"),
            ),
            SyncError::NotPending { job_id, status } => Self::new(
                StatusCode::CONFLICT,
                "JOB_NOT_PENDING",
                &format!("Sync job {job_id} is {status}; only pending jobs can be cancelled"),
            ),
            SyncError::InvalidSettings(message) => {
                validation_error("Invalid sync settings", json!({ "settings": message }))
            }
            SyncError::Cancelled => Self::new(
                StatusCode::CONFLICT,
                "JOB_CANCELLED",
                "Sync job was cancelled",
            ),
        }
    }
}

/// Errors returned by the external pharmacy map to 502 with upstream metadata.
pub fn upstream_error(upstream: &str, status: Option<u16>, message: Option<String>) -> ApiError {
    let details = UpstreamError {
        upstream: upstream.to_string(),
        status,
        message_snippet: message.map(|m| {
            if m.chars().count() > 200 {
                let truncated: String = m.chars().take(200).collect();
                format!("{}...", truncated)
            } else {
                m
            }
        }),
    };

    let message = match status {
        Some(code) => format!("Upstream {} returned error status {}", upstream, code),
        None => format!("Upstream {} request failed", upstream),
    };

    ApiError::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", &message).with_details(json!(details))
}

pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let mut error = unauthorized(message);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}
