//! # Data Models
//!
//! SeaORM entities for the zone serviceability and pharmacy sync tables.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod medicine;
pub mod pincode_zone;
pub mod service_booking;
pub mod sync_job;
pub mod sync_log;
pub mod sync_settings;
pub mod zone_service_config;

pub use medicine::Entity as Medicine;
pub use pincode_zone::Entity as PincodeZone;
pub use service_booking::Entity as ServiceBooking;
pub use sync_job::Entity as SyncJob;
pub use sync_log::Entity as SyncLog;
pub use sync_settings::Entity as SyncSettings;
pub use zone_service_config::Entity as ZoneServiceConfig;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "care-engine".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
