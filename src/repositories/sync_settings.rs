//! The single sync settings row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};

use crate::db::to_db_time;
use crate::models::sync_settings::{
    ActiveModel, Column, Entity as SyncSettingsRow, Model, SETTINGS_ROW_ID,
};
use crate::sync::SyncSettings;

#[derive(Debug, Clone)]
pub struct SyncSettingsRepository {
    db: Arc<DatabaseConnection>,
}

fn to_active_model(settings: &SyncSettings, now: DateTime<Utc>) -> ActiveModel {
    let job_types: Vec<&str> = settings
        .job_types
        .iter()
        .map(|job_type| job_type.as_str())
        .collect();
    ActiveModel {
        id: Set(SETTINGS_ROW_ID),
        enabled: Set(settings.enabled),
        interval_minutes: Set(i32::try_from(settings.interval_minutes).unwrap_or(i32::MAX)),
        job_types: Set(serde_json::json!(job_types)),
        max_retries: Set(i32::try_from(settings.max_retries).unwrap_or(i32::MAX)),
        retry_delay_seconds: Set(
            i32::try_from(settings.retry_delay_seconds).unwrap_or(i32::MAX),
        ),
        updated_at: Set(to_db_time(now)),
    }
}

impl SyncSettingsRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self) -> Result<Option<Model>, DbErr> {
        SyncSettingsRow::find_by_id(SETTINGS_ROW_ID)
            .one(self.db.as_ref())
            .await
    }

    /// Current row, inserting `seed` first when none exists.
    pub async fn get_or_init(&self, seed: &SyncSettings) -> Result<Model, DbErr> {
        if let Some(existing) = self.get().await? {
            return Ok(existing);
        }

        SyncSettingsRow::insert(to_active_model(seed, seed.updated_at))
            .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await?;

        self.get()
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("sync settings row missing after insert".into()))
    }

    pub async fn save(&self, settings: &SyncSettings, now: DateTime<Utc>) -> Result<Model, DbErr> {
        SyncSettingsRow::insert(to_active_model(settings, now))
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([
                        Column::Enabled,
                        Column::IntervalMinutes,
                        Column::JobTypes,
                        Column::MaxRetries,
                        Column::RetryDelaySeconds,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        self.get()
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("sync settings row missing after save".into()))
    }
}
