//! Runtime sync settings.
//!
//! A single row seeded from [`SyncConfig`] the first time it is read. The
//! scheduler re-reads it on every tick, so edits apply without a restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{JobType, SyncError};
use crate::config::SyncConfig;
use crate::models::sync_settings::Model;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncSettings {
    pub enabled: bool,
    pub interval_minutes: u32,
    pub job_types: Vec<JobType>,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub updated_at: DateTime<Utc>,
}

impl SyncSettings {
    /// Seed values. Unknown job type names were already rejected by config
    /// validation, so they are dropped here.
    pub fn from_config(config: &SyncConfig, now: DateTime<Utc>) -> Self {
        Self {
            enabled: true,
            interval_minutes: config.default_interval_minutes,
            job_types: config
                .enabled_job_types
                .iter()
                .filter_map(|name| name.parse().ok())
                .collect(),
            max_retries: config.max_retries,
            retry_delay_seconds: config.retry_base_seconds,
            updated_at: now,
        }
    }

    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.interval_minutes.max(1)))
    }

    /// Applies every field or none of them.
    pub fn apply(&mut self, update: SyncSettingsUpdate) -> Result<(), String> {
        let mut next = self.clone();
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        if let Some(interval_minutes) = update.interval_minutes {
            if interval_minutes == 0 || interval_minutes > 24 * 60 {
                return Err(format!(
                    "interval_minutes must be between 1 and 1440, got {interval_minutes}"
                ));
            }
            next.interval_minutes = interval_minutes;
        }
        if let Some(job_types) = update.job_types {
            let mut deduped: Vec<JobType> = Vec::with_capacity(job_types.len());
            for job_type in job_types {
                if !deduped.contains(&job_type) {
                    deduped.push(job_type);
                }
            }
            next.job_types = deduped;
        }
        if let Some(max_retries) = update.max_retries {
            if max_retries > 20 {
                return Err(format!("max_retries must be at most 20, got {max_retries}"));
            }
            next.max_retries = max_retries;
        }
        if let Some(retry_delay_seconds) = update.retry_delay_seconds {
            if retry_delay_seconds == 0 || retry_delay_seconds > i32::MAX as u64 {
                return Err("retry_delay_seconds must be positive".to_string());
            }
            next.retry_delay_seconds = retry_delay_seconds;
        }
        *self = next;
        Ok(())
    }
}

impl TryFrom<Model> for SyncSettings {
    type Error = SyncError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let names: Vec<String> = serde_json::from_value(model.job_types).map_err(|err| {
            SyncError::Database(sea_orm::DbErr::Custom(format!(
                "stored sync job types are unreadable: {err}"
            )))
        })?;
        let job_types = names
            .iter()
            .map(|name| name.parse::<JobType>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enabled: model.enabled,
            interval_minutes: u32::try_from(model.interval_minutes).unwrap_or(1).max(1),
            job_types,
            max_retries: u32::try_from(model.max_retries).unwrap_or(0),
            retry_delay_seconds: u64::try_from(model.retry_delay_seconds).unwrap_or(1).max(1),
            updated_at: model.updated_at.to_utc(),
        })
    }
}

/// Partial update accepted by the settings endpoint.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SyncSettingsUpdate {
    pub enabled: Option<bool>,
    pub interval_minutes: Option<u32>,
    pub job_types: Option<Vec<JobType>>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}
