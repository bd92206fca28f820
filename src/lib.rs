//! # Care Engine Library
//!
//! Zone serviceability and dynamic pricing for home healthcare services,
//! plus the scheduler that keeps the pharmacy catalogue in sync.

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pharmacy;
pub mod repositories;
pub mod scheduler;
pub mod server;
pub mod sync;
pub mod sync_executor;
pub mod telemetry;
pub mod zones;
pub use migration;
