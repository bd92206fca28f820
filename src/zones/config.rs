//! Zone service configuration as the engine sees it.
//!
//! Rows in `zone_service_configs` keep money as doubles and structured
//! fields as JSON. This module owns the typed view and the conversions in
//! both directions, and refuses to write a configuration that fails
//! [`ServiceSettings::validate`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::pricing::round_money;
use super::{EngineError, OperatingHours, ServiceExtension, ServiceType};
use crate::db::to_db_time;
use crate::models::zone_service_config::{ActiveModel, Model};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AgeRestrictions {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Everything about a service in a zone except its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceSettings {
    pub is_enabled: bool,
    #[schema(value_type = String, example = "50.00")]
    pub delivery_fee: Decimal,
    #[schema(value_type = String, example = "100.00")]
    pub min_order_amount: Decimal,
    #[schema(value_type = Option<String>)]
    pub max_order_amount: Option<Decimal>,
    /// Applied to the order value inside a peak window. At least 1.
    #[schema(value_type = String, example = "1.2")]
    pub peak_hour_multiplier: Decimal,
    pub distance_based_pricing: bool,
    pub estimated_delivery_time: String,
    pub operating_hours: OperatingHours,
    pub capacity_per_hour: u32,
    pub staff_required: u32,
    #[serde(default)]
    pub equipment_required: Vec<String>,
    pub advance_booking_days: u32,
    pub emergency_available: bool,
    pub prescription_required: bool,
    #[serde(default)]
    pub age_restrictions: Option<AgeRestrictions>,
    #[serde(default)]
    pub special_requirements: Vec<String>,
    #[schema(value_type = Object)]
    pub custom_config: ServiceExtension,
}

impl ServiceSettings {
    pub fn validate(&self, service_type: ServiceType) -> Result<(), EngineError> {
        let invalid = |message: String| Err(EngineError::InvalidConfig(message));

        if self.delivery_fee.is_sign_negative() {
            return invalid("delivery_fee must not be negative".to_string());
        }
        if self.min_order_amount.is_sign_negative() {
            return invalid("min_order_amount must not be negative".to_string());
        }
        if let Some(max) = self.max_order_amount
            && max < self.min_order_amount
        {
            return invalid(format!(
                "max_order_amount {max} is below min_order_amount {}",
                self.min_order_amount
            ));
        }
        if self.peak_hour_multiplier < Decimal::ONE {
            return invalid(format!(
                "peak_hour_multiplier {} must be at least 1",
                self.peak_hour_multiplier
            ));
        }
        if i32::try_from(self.capacity_per_hour).is_err()
            || i32::try_from(self.staff_required).is_err()
            || i32::try_from(self.advance_booking_days).is_err()
        {
            return invalid("numeric limits exceed storage range".to_string());
        }
        if let Some(ages) = self.age_restrictions
            && let (Some(min), Some(max)) = (ages.min, ages.max)
            && min > max
        {
            return invalid(format!("age min {min} is above age max {max}"));
        }
        self.operating_hours
            .validate()
            .map_err(EngineError::InvalidConfig)?;
        if self.custom_config.service_type() != service_type {
            return invalid(format!(
                "custom_config is for {} but the service is {service_type}",
                self.custom_config.service_type()
            ));
        }
        Ok(())
    }
}

/// Built in starting point for a service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZoneServiceConfigTemplate {
    pub service_type: ServiceType,
    #[serde(flatten)]
    pub settings: ServiceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZoneServiceConfig {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub service_type: ServiceType,
    #[serde(flatten)]
    pub settings: ServiceSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ZoneServiceConfig {
    pub fn new(zone_id: Uuid, service_type: ServiceType, settings: ServiceSettings) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            zone_id,
            service_type,
            settings,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_template(zone_id: Uuid, template: ZoneServiceConfigTemplate) -> Self {
        Self::new(zone_id, template.service_type, template.settings)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.settings.validate(self.service_type)
    }

    /// Full active model, every column set. Used for upserts.
    pub fn to_active_model(&self) -> Result<ActiveModel, EngineError> {
        let settings = &self.settings;
        let ages = settings.age_restrictions.unwrap_or_default();

        Ok(ActiveModel {
            id: Set(self.id),
            zone_id: Set(self.zone_id),
            service_type: Set(self.service_type.as_str().to_string()),
            is_enabled: Set(settings.is_enabled),
            delivery_fee: Set(money_to_db("delivery_fee", settings.delivery_fee)?),
            min_order_amount: Set(money_to_db("min_order_amount", settings.min_order_amount)?),
            max_order_amount: Set(settings
                .max_order_amount
                .map(|max| money_to_db("max_order_amount", max))
                .transpose()?),
            peak_hour_multiplier: Set(decimal_to_db(
                "peak_hour_multiplier",
                settings.peak_hour_multiplier,
            )?),
            distance_based_pricing: Set(settings.distance_based_pricing),
            estimated_delivery_time: Set(settings.estimated_delivery_time.clone()),
            operating_hours: Set(to_json("operating_hours", &settings.operating_hours)?),
            capacity_per_hour: Set(to_db_int("capacity_per_hour", settings.capacity_per_hour)?),
            staff_required: Set(to_db_int("staff_required", settings.staff_required)?),
            equipment_required: Set(to_json(
                "equipment_required",
                &settings.equipment_required,
            )?),
            advance_booking_days: Set(to_db_int(
                "advance_booking_days",
                settings.advance_booking_days,
            )?),
            emergency_available: Set(settings.emergency_available),
            prescription_required: Set(settings.prescription_required),
            age_min: Set(ages.min.map(|age| to_db_int("age_min", age)).transpose()?),
            age_max: Set(ages.max.map(|age| to_db_int("age_max", age)).transpose()?),
            special_requirements: Set(to_json(
                "special_requirements",
                &settings.special_requirements,
            )?),
            custom_config: Set(to_json("custom_config", &settings.custom_config)?),
            created_at: Set(to_db_time(self.created_at)),
            updated_at: Set(to_db_time(self.updated_at)),
        })
    }
}

impl TryFrom<Model> for ZoneServiceConfig {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let service_type: ServiceType = model.service_type.parse()?;
        let age_restrictions = match (model.age_min, model.age_max) {
            (None, None) => None,
            (min, max) => Some(AgeRestrictions {
                min: min.map(|age| from_db_int("age_min", age)).transpose()?,
                max: max.map(|age| from_db_int("age_max", age)).transpose()?,
            }),
        };

        let settings = ServiceSettings {
            is_enabled: model.is_enabled,
            delivery_fee: money_from_db("delivery_fee", model.delivery_fee)?,
            min_order_amount: money_from_db("min_order_amount", model.min_order_amount)?,
            max_order_amount: model
                .max_order_amount
                .map(|max| money_from_db("max_order_amount", max))
                .transpose()?,
            peak_hour_multiplier: decimal_from_db(
                "peak_hour_multiplier",
                model.peak_hour_multiplier,
            )?,
            distance_based_pricing: model.distance_based_pricing,
            estimated_delivery_time: model.estimated_delivery_time,
            operating_hours: from_json("operating_hours", model.operating_hours)?,
            capacity_per_hour: from_db_int("capacity_per_hour", model.capacity_per_hour)?,
            staff_required: from_db_int("staff_required", model.staff_required)?,
            equipment_required: from_json("equipment_required", model.equipment_required)?,
            advance_booking_days: from_db_int("advance_booking_days", model.advance_booking_days)?,
            emergency_available: model.emergency_available,
            prescription_required: model.prescription_required,
            age_restrictions,
            special_requirements: from_json("special_requirements", model.special_requirements)?,
            custom_config: ServiceExtension::from_stored(service_type, &model.custom_config)
                .map_err(EngineError::InvalidConfig)?,
        };

        Ok(Self {
            id: model.id,
            zone_id: model.zone_id,
            service_type,
            settings,
            created_at: model.created_at.to_utc(),
            updated_at: model.updated_at.to_utc(),
        })
    }
}

fn stored_error(field: &str, detail: impl std::fmt::Display) -> EngineError {
    EngineError::InvalidConfig(format!("stored {field} is unreadable: {detail}"))
}

fn decimal_from_db(field: &str, value: f64) -> Result<Decimal, EngineError> {
    Decimal::try_from(value).map_err(|err| stored_error(field, err))
}

fn money_from_db(field: &str, value: f64) -> Result<Decimal, EngineError> {
    decimal_from_db(field, value).map(round_money)
}

fn decimal_to_db(field: &str, value: Decimal) -> Result<f64, EngineError> {
    value
        .to_f64()
        .ok_or_else(|| EngineError::InvalidConfig(format!("{field} {value} cannot be stored")))
}

fn money_to_db(field: &str, value: Decimal) -> Result<f64, EngineError> {
    decimal_to_db(field, round_money(value))
}

fn from_db_int(field: &str, value: i32) -> Result<u32, EngineError> {
    u32::try_from(value).map_err(|err| stored_error(field, err))
}

fn to_db_int(field: &str, value: u32) -> Result<i32, EngineError> {
    i32::try_from(value)
        .map_err(|_| EngineError::InvalidConfig(format!("{field} {value} is out of range")))
}

fn from_json<T: serde::de::DeserializeOwned>(
    field: &str,
    value: serde_json::Value,
) -> Result<T, EngineError> {
    serde_json::from_value(value).map_err(|err| stored_error(field, err))
}

fn to_json<T: Serialize>(field: &str, value: &T) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(value)
        .map_err(|err| EngineError::InvalidConfig(format!("{field} cannot be encoded: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::defaults::default_template;
    use rust_decimal::dec;
    use sea_orm::ActiveValue;

    fn medicine_config() -> ZoneServiceConfig {
        ZoneServiceConfig::from_template(
            Uuid::new_v4(),
            default_template(ServiceType::MedicineDelivery),
        )
    }

    #[test]
    fn default_templates_validate() {
        for service_type in ServiceType::ALL {
            let config = ZoneServiceConfig::from_template(
                Uuid::new_v4(),
                default_template(service_type),
            );
            config.validate().unwrap();
        }
    }

    #[test]
    fn multiplier_below_one_is_rejected() {
        let mut config = medicine_config();
        config.settings.peak_hour_multiplier = dec!(0.9);

        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(message)) if message.contains("peak_hour_multiplier")
        ));
    }

    #[test]
    fn max_below_min_is_rejected() {
        let mut config = medicine_config();
        config.settings.min_order_amount = dec!(500);
        config.settings.max_order_amount = Some(dec!(100));

        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn extension_must_match_service_type() {
        let mut config = medicine_config();
        config.settings.custom_config = ServiceExtension::default_for(ServiceType::Ambulance);

        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn inverted_age_range_is_rejected() {
        let mut config = medicine_config();
        config.settings.age_restrictions = Some(AgeRestrictions {
            min: Some(60),
            max: Some(18),
        });

        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn active_model_round_trips_through_model() {
        let mut config = medicine_config();
        config.settings.delivery_fee = dec!(49.5);
        config.settings.age_restrictions = Some(AgeRestrictions {
            min: Some(18),
            max: None,
        });

        let active = config.to_active_model().unwrap();
        let model = Model {
            id: unwrap_set(active.id),
            zone_id: unwrap_set(active.zone_id),
            service_type: unwrap_set(active.service_type),
            is_enabled: unwrap_set(active.is_enabled),
            delivery_fee: unwrap_set(active.delivery_fee),
            min_order_amount: unwrap_set(active.min_order_amount),
            max_order_amount: unwrap_set(active.max_order_amount),
            peak_hour_multiplier: unwrap_set(active.peak_hour_multiplier),
            distance_based_pricing: unwrap_set(active.distance_based_pricing),
            estimated_delivery_time: unwrap_set(active.estimated_delivery_time),
            operating_hours: unwrap_set(active.operating_hours),
            capacity_per_hour: unwrap_set(active.capacity_per_hour),
            staff_required: unwrap_set(active.staff_required),
            equipment_required: unwrap_set(active.equipment_required),
            advance_booking_days: unwrap_set(active.advance_booking_days),
            emergency_available: unwrap_set(active.emergency_available),
            prescription_required: unwrap_set(active.prescription_required),
            age_min: unwrap_set(active.age_min),
            age_max: unwrap_set(active.age_max),
            special_requirements: unwrap_set(active.special_requirements),
            custom_config: unwrap_set(active.custom_config),
            created_at: unwrap_set(active.created_at),
            updated_at: unwrap_set(active.updated_at),
        };

        let decoded = ZoneServiceConfig::try_from(model).unwrap();
        assert_eq!(decoded.settings, config.settings);
        assert_eq!(decoded.service_type, ServiceType::MedicineDelivery);
    }

    #[test]
    fn unknown_stored_service_type_is_an_error() {
        let config = medicine_config();
        let active = config.to_active_model().unwrap();
        let mut model = Model {
            id: unwrap_set(active.id),
            zone_id: unwrap_set(active.zone_id),
            service_type: "teleportation".to_string(),
            is_enabled: true,
            delivery_fee: 0.0,
            min_order_amount: 0.0,
            max_order_amount: None,
            peak_hour_multiplier: 1.0,
            distance_based_pricing: false,
            estimated_delivery_time: String::new(),
            operating_hours: serde_json::json!({}),
            capacity_per_hour: 1,
            staff_required: 1,
            equipment_required: serde_json::json!([]),
            advance_booking_days: 1,
            emergency_available: false,
            prescription_required: false,
            age_min: None,
            age_max: None,
            special_requirements: serde_json::json!([]),
            custom_config: serde_json::Value::Null,
            created_at: unwrap_set(active.created_at),
            updated_at: unwrap_set(active.updated_at),
        };

        assert!(matches!(
            ZoneServiceConfig::try_from(model.clone()),
            Err(EngineError::UnknownServiceType(_))
        ));

        model.service_type = "nursing".to_string();
        model.capacity_per_hour = -1;
        assert!(matches!(
            ZoneServiceConfig::try_from(model),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    fn unwrap_set<T: Into<sea_orm::Value>>(value: ActiveValue<T>) -> T {
        match value {
            ActiveValue::Set(inner) | ActiveValue::Unchanged(inner) => inner,
            ActiveValue::NotSet => panic!("column not set"),
        }
    }
}
