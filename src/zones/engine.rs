//! The serviceability and pricing engine.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use metrics::counter;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::capacity::{CapacityQuery, SharedBookingStore, check_capacity};
use super::config::{ServiceSettings, ZoneServiceConfig, ZoneServiceConfigTemplate};
use super::defaults::default_template;
use super::pricing::{OrderDetails, PriceCalculation, calculate_price};
use super::{CapacityStatus, DbBookingStore, EngineError, ServiceType, is_service_operational};
use crate::clock::{SharedClock, SystemClock};
use crate::config::{AppConfig, CapacityConfig, PricingConfig};
use crate::repositories::{PincodeZoneRepository, ZoneServiceConfigRepository};

pub const REASON_PINCODE_NOT_SERVICEABLE: &str = "pincode not serviceable";
pub const REASON_SERVICE_NOT_AVAILABLE: &str = "service not available in this zone";
pub const REASON_NOT_OPERATIONAL: &str = "not operational at this time";

static PINCODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").ok());

fn is_valid_pincode(pincode: &str) -> bool {
    PINCODE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(pincode))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceAvailability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub delivery_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_time: Option<String>,
}

impl ServiceAvailability {
    fn unavailable(reason: &str, zone_id: Option<Uuid>) -> Self {
        Self {
            available: false,
            reason: Some(reason.to_string()),
            zone_id,
            delivery_fee: None,
            min_order_amount: None,
            estimated_delivery_time: None,
        }
    }

    fn available(zone_id: Uuid, settings: &ServiceSettings) -> Self {
        Self {
            available: true,
            reason: None,
            zone_id: Some(zone_id),
            delivery_fee: Some(settings.delivery_fee),
            min_order_amount: Some(settings.min_order_amount),
            estimated_delivery_time: Some(settings.estimated_delivery_time.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailedServiceConfig {
    pub service_type: ServiceType,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BulkConfigureOutcome {
    pub configured: Vec<ZoneServiceConfig>,
    pub failed: Vec<FailedServiceConfig>,
}

/// Answers serviceability, pricing and capacity questions for zones.
#[derive(Clone)]
pub struct ServiceCustomizationEngine {
    configs: ZoneServiceConfigRepository,
    pincodes: PincodeZoneRepository,
    bookings: SharedBookingStore,
    clock: SharedClock,
    pricing: PricingConfig,
    capacity: CapacityConfig,
    offset: FixedOffset,
}

impl ServiceCustomizationEngine {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            configs: ZoneServiceConfigRepository::new(db.clone()),
            pincodes: PincodeZoneRepository::new(db.clone()),
            bookings: Arc::new(DbBookingStore::new(db)),
            clock: Arc::new(SystemClock),
            pricing: config.pricing.clone(),
            capacity: config.capacity.clone(),
            offset: config.local_offset(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_booking_store(mut self, store: SharedBookingStore) -> Self {
        self.bookings = store;
        self
    }

    /// Current local wall clock time.
    pub fn local_now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.offset).naive_local()
    }

    /// Stored configuration, `None` when the service was never configured.
    pub async fn get_zone_service_config(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
    ) -> Result<Option<ZoneServiceConfig>, EngineError> {
        self.configs
            .find(zone_id, service_type.as_str())
            .await?
            .map(ZoneServiceConfig::try_from)
            .transpose()
    }

    pub async fn list_zone_services(
        &self,
        zone_id: Uuid,
    ) -> Result<Vec<ZoneServiceConfig>, EngineError> {
        self.configs
            .list_by_zone(zone_id)
            .await?
            .into_iter()
            .map(ZoneServiceConfig::try_from)
            .collect()
    }

    #[instrument(skip(self), fields(service_type = %service_type))]
    pub async fn get_service_availability(
        &self,
        pincode: &str,
        service_type: ServiceType,
    ) -> Result<ServiceAvailability, EngineError> {
        let pincode = pincode.trim();
        if !is_valid_pincode(pincode) {
            return Err(EngineError::InvalidPincode(pincode.to_string()));
        }

        let Some(zone_id) = self.pincodes.resolve_zone(pincode).await? else {
            debug!(pincode, "Pincode has no active zone");
            return Ok(ServiceAvailability::unavailable(
                REASON_PINCODE_NOT_SERVICEABLE,
                None,
            ));
        };

        let config = match self.get_zone_service_config(zone_id, service_type).await? {
            Some(config) if config.settings.is_enabled => config,
            _ => {
                return Ok(ServiceAvailability::unavailable(
                    REASON_SERVICE_NOT_AVAILABLE,
                    Some(zone_id),
                ));
            }
        };

        if !is_service_operational(&config.settings.operating_hours, self.local_now()) {
            return Ok(ServiceAvailability::unavailable(
                REASON_NOT_OPERATIONAL,
                Some(zone_id),
            ));
        }

        Ok(ServiceAvailability::available(zone_id, &config.settings))
    }

    #[instrument(skip(self, order), fields(zone_id = %zone_id, service_type = %service_type))]
    pub async fn calculate_dynamic_price(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        order: &OrderDetails,
    ) -> Result<PriceCalculation, EngineError> {
        order.validate()?;
        let config = self.require_config(zone_id, service_type).await?;

        let quote = calculate_price(
            &config.settings,
            order,
            &self.pricing,
            self.local_now().time(),
        )?;

        counter!("pricing_quotes_total", "service_type" => service_type.as_str()).increment(1);
        debug!(
            original_price = %quote.original_price,
            final_price = %quote.final_price,
            adjustments = quote.breakdown.len(),
            "Price calculated"
        );

        Ok(quote)
    }

    #[instrument(skip(self), fields(zone_id = %zone_id, service_type = %service_type))]
    pub async fn check_service_capacity(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        requested: DateTime<Utc>,
    ) -> Result<CapacityStatus, EngineError> {
        let config = self.require_config(zone_id, service_type).await?;
        let query = CapacityQuery {
            zone_id,
            service_type,
            settings: &config.settings,
            offset: self.offset,
            max_lookahead_hours: self.capacity.max_lookahead_hours,
        };

        Ok(check_capacity(self.bookings.as_ref(), &query, requested).await?)
    }

    pub fn get_default_service_config(
        &self,
        service_type: ServiceType,
    ) -> ZoneServiceConfigTemplate {
        default_template(service_type)
    }

    /// Validate and store `settings`, replacing any existing row.
    #[instrument(skip(self, settings), fields(zone_id = %zone_id, service_type = %service_type))]
    pub async fn upsert_zone_service_config(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        settings: ServiceSettings,
    ) -> Result<ZoneServiceConfig, EngineError> {
        let mut config = ZoneServiceConfig::new(zone_id, service_type, settings);
        let now = self.clock.now();
        config.created_at = now;
        config.updated_at = now;
        config.validate()?;

        let stored = self.configs.upsert(config.to_active_model()?).await?;
        info!("Zone service configuration stored");
        ZoneServiceConfig::try_from(stored)
    }

    pub async fn set_service_enabled(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        enabled: bool,
    ) -> Result<ZoneServiceConfig, EngineError> {
        let updated = self
            .configs
            .set_enabled(zone_id, service_type.as_str(), enabled, self.clock.now())
            .await?
            .ok_or(EngineError::ConfigNotFound {
                zone_id,
                service_type,
            })?;
        info!(zone_id = %zone_id, service_type = %service_type, enabled, "Service toggled");
        ZoneServiceConfig::try_from(updated)
    }

    pub async fn delete_zone_service_config(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
    ) -> Result<(), EngineError> {
        if !self.configs.delete(zone_id, service_type.as_str()).await? {
            return Err(EngineError::ConfigNotFound {
                zone_id,
                service_type,
            });
        }
        info!(zone_id = %zone_id, service_type = %service_type, "Zone service configuration deleted");
        Ok(())
    }

    /// Provision `service_types` in a zone from the built in templates.
    ///
    /// Each type is stored on its own; one failing type is logged and
    /// reported without stopping the others.
    #[instrument(skip(self, service_types), fields(zone_id = %zone_id))]
    pub async fn bulk_configure_zone_services(
        &self,
        zone_id: Uuid,
        service_types: &[ServiceType],
    ) -> BulkConfigureOutcome {
        let mut outcome = BulkConfigureOutcome::default();

        for &service_type in service_types {
            let template = default_template(service_type);
            match self
                .upsert_zone_service_config(zone_id, service_type, template.settings)
                .await
            {
                Ok(config) => outcome.configured.push(config),
                Err(err) => {
                    warn!(
                        zone_id = %zone_id,
                        service_type = %service_type,
                        error = %err,
                        "Skipping service type during bulk configuration"
                    );
                    outcome.failed.push(FailedServiceConfig {
                        service_type,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            configured = outcome.configured.len(),
            failed = outcome.failed.len(),
            "Bulk zone configuration finished"
        );
        outcome
    }

    async fn require_config(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
    ) -> Result<ZoneServiceConfig, EngineError> {
        self.get_zone_service_config(zone_id, service_type)
            .await?
            .ok_or(EngineError::ConfigNotFound {
                zone_id,
                service_type,
            })
    }
}
