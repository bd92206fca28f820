//! Database migrations for the care engine.
//!
//! Zone serviceability tables first, then the pharmacy sync tables.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_090000_create_zone_service_configs;
mod m2026_01_05_090100_create_enhanced_pincode_zones;
mod m2026_01_05_090200_create_service_bookings;
mod m2026_01_05_090300_create_medicines;
mod m2026_01_05_090400_create_evitalrx_scheduled_jobs;
mod m2026_01_05_090500_create_evitalrx_sync_logs;
mod m2026_01_05_090600_create_evitalrx_sync_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_090000_create_zone_service_configs::Migration),
            Box::new(m2026_01_05_090100_create_enhanced_pincode_zones::Migration),
            Box::new(m2026_01_05_090200_create_service_bookings::Migration),
            Box::new(m2026_01_05_090300_create_medicines::Migration),
            Box::new(m2026_01_05_090400_create_evitalrx_scheduled_jobs::Migration),
            Box::new(m2026_01_05_090500_create_evitalrx_sync_logs::Migration),
            Box::new(m2026_01_05_090600_create_evitalrx_sync_settings::Migration),
        ]
    }
}
