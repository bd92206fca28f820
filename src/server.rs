//! # Server Configuration
//!
//! Router, shared state and the serve loop for the care engine API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::clock::{SharedClock, SystemClock};
use crate::config::AppConfig;
use crate::handlers;
use crate::pharmacy::{DisabledPharmacyApi, EvitalRxClient, PharmacyApi};
use crate::scheduler::SyncScheduler;
use crate::sync::{RetryPolicy, SyncRunner};
use crate::sync_executor::SyncExecutor;
use crate::telemetry::{TraceContext, with_trace_context};
use crate::zones::ServiceCustomizationEngine;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub engine: ServiceCustomizationEngine,
    pub scheduler: SyncScheduler,
    pub clock: SharedClock,
}

impl AppState {
    /// Wire the engine and the sync stack over one pool and one clock.
    pub fn new(
        config: Arc<AppConfig>,
        db: Arc<DatabaseConnection>,
        api: Arc<dyn PharmacyApi>,
        clock: SharedClock,
        shutdown: CancellationToken,
    ) -> Self {
        let engine = ServiceCustomizationEngine::new(db.clone(), &config).with_clock(clock.clone());
        let runner = SyncRunner::new(api, db.clone(), clock.clone(), config.pharmacy.page_size)
            .with_shutdown(shutdown);
        let executor = SyncExecutor::new(
            db.clone(),
            runner,
            RetryPolicy::from_config(&config.sync),
            clock.clone(),
        );
        let scheduler = SyncScheduler::new(config.sync.clone(), db.clone(), executor, clock.clone());

        Self {
            config,
            db,
            engine,
            scheduler,
            clock,
        }
    }
}

/// Pharmacy client for `config`, or the disabled stand-in when no key is set.
pub fn pharmacy_api(config: &AppConfig) -> Arc<dyn PharmacyApi> {
    match EvitalRxClient::new(&config.pharmacy) {
        Ok(client) => {
            info!(base_url = %client.base_url(), "Pharmacy client configured");
            Arc::new(client)
        }
        Err(err) => {
            warn!(error = %err, "Pharmacy client unavailable; sync jobs will fail");
            Arc::new(DisabledPharmacyApi)
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/availability", get(handlers::serviceability::get_availability))
        .route("/pricing/quote", post(handlers::serviceability::quote_price))
        .route("/capacity", get(handlers::serviceability::get_capacity))
        .route(
            "/zones/{zone_id}/services",
            get(handlers::zones::list_zone_services),
        )
        .route(
            "/zones/{zone_id}/services/bulk",
            post(handlers::zones::bulk_configure),
        )
        .route(
            "/zones/{zone_id}/services/{service_type}",
            get(handlers::zones::get_zone_service)
                .put(handlers::zones::put_zone_service)
                .delete(handlers::zones::delete_zone_service),
        )
        .route(
            "/zones/{zone_id}/services/{service_type}/toggle",
            post(handlers::zones::toggle_zone_service),
        )
        .route(
            "/service-types/{service_type}/defaults",
            get(handlers::zones::get_service_defaults),
        )
        .route(
            "/sync/jobs",
            get(handlers::sync::list_jobs).post(handlers::sync::trigger_sync),
        )
        .route("/sync/jobs/{id}", get(handlers::sync::get_job))
        .route("/sync/jobs/{id}/cancel", post(handlers::sync::cancel_job))
        .route("/sync/logs", get(handlers::sync::list_logs))
        .route(
            "/sync/settings",
            get(handlers::sync::get_settings).put(handlers::sync::update_settings),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api", api)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Scope each request in a trace context so errors carry its id.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let context = TraceContext { trace_id };
    request.extensions_mut().insert(context.clone());
    with_trace_context(context, next.run(request)).await
}

/// Serve the API and run the sync scheduler until SIGINT/SIGTERM.
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let shutdown = CancellationToken::new();
    let api = pharmacy_api(&config);
    let sync_possible = config.pharmacy.api_key.is_some();

    let state = AppState::new(
        config.clone(),
        Arc::new(db),
        api,
        Arc::new(SystemClock),
        shutdown.clone(),
    );

    let scheduler_handle = if sync_possible {
        Some(state.scheduler.clone().start(shutdown.clone()))
    } else {
        warn!("Sync scheduler not started: pharmacy api key is not set");
        None
    };

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, profile = %config.profile, "Server listening");

    let app = create_app(state);
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler_handle
        && let Err(err) = handle.await
    {
        warn!(error = %err, "Sync scheduler task ended abnormally");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, starting graceful shutdown");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::serviceability::get_availability,
        crate::handlers::serviceability::quote_price,
        crate::handlers::serviceability::get_capacity,
        crate::handlers::zones::list_zone_services,
        crate::handlers::zones::get_zone_service,
        crate::handlers::zones::put_zone_service,
        crate::handlers::zones::delete_zone_service,
        crate::handlers::zones::toggle_zone_service,
        crate::handlers::zones::bulk_configure,
        crate::handlers::zones::get_service_defaults,
        crate::handlers::sync::list_jobs,
        crate::handlers::sync::get_job,
        crate::handlers::sync::trigger_sync,
        crate::handlers::sync::cancel_job,
        crate::handlers::sync::list_logs,
        crate::handlers::sync::get_settings,
        crate::handlers::sync::update_settings,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthStatus,
            crate::error::ApiError,
            crate::handlers::serviceability::QuoteRequest,
            crate::handlers::zones::ToggleRequest,
            crate::handlers::zones::BulkConfigureRequest,
            crate::handlers::sync::JobInfo,
            crate::handlers::sync::SyncLogInfo,
            crate::handlers::sync::TriggerSyncRequest,
            crate::zones::ServiceType,
            crate::zones::ServiceAvailability,
            crate::zones::ServiceSettings,
            crate::zones::ZoneServiceConfig,
            crate::zones::ZoneServiceConfigTemplate,
            crate::zones::BulkConfigureOutcome,
            crate::zones::OrderDetails,
            crate::zones::PriceCalculation,
            crate::zones::PriceAdjustment,
            crate::zones::CapacityStatus,
            crate::sync::SyncSettings,
            crate::sync::SyncSettingsUpdate,
            crate::sync::JobType,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Care Engine API",
        description = "Zone serviceability, dynamic pricing and pharmacy sync administration",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
