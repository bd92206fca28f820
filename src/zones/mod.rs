//! Zone serviceability and dynamic pricing.
//!
//! Everything a customer facing request needs to know about a service in a
//! zone: whether it is offered at a pincode right now, what it costs and
//! whether there is capacity left in the requested hour.

pub mod capacity;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod extension;
pub mod pricing;
pub mod schedule;
pub mod service_type;

use sea_orm::DbErr;
use uuid::Uuid;

pub use capacity::{BookingStore, CapacityStatus, DbBookingStore, InMemoryBookingStore};
pub use config::{AgeRestrictions, ServiceSettings, ZoneServiceConfig, ZoneServiceConfigTemplate};
pub use engine::{BulkConfigureOutcome, ServiceAvailability, ServiceCustomizationEngine};
pub use extension::{ServiceExtension, ServiceOptions};
pub use pricing::{AdjustmentKind, CustomerType, OrderDetails, PriceAdjustment, PriceCalculation};
pub use schedule::{
    ClockTime, DaySchedule, OperatingHours, is_operational_within, is_service_operational,
};
pub use service_type::ServiceType;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no configuration for {service_type} in zone {zone_id}")]
    ConfigNotFound {
        zone_id: Uuid,
        service_type: ServiceType,
    },
    #[error("invalid service configuration: {0}")]
    InvalidConfig(String),
    #[error("unknown service type '{0}'")]
    UnknownServiceType(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("invalid pincode '{0}'")]
    InvalidPincode(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}
