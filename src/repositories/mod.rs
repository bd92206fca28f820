//! # Repository Layer
//!
//! Thin wrappers over SeaORM that own the queries for each table. Every
//! repository holds the shared connection and returns `DbErr` untouched;
//! callers decide how to surface it.

pub mod medicine;
pub mod pincode_zone;
pub mod sync_job;
pub mod sync_log;
pub mod sync_settings;
pub mod zone_service_config;

pub use medicine::MedicineRepository;
pub use pincode_zone::PincodeZoneRepository;
pub use sync_job::{JobFilter, SyncJobRepository};
pub use sync_log::SyncLogRepository;
pub use sync_settings::SyncSettingsRepository;
pub use zone_service_config::ZoneServiceConfigRepository;
