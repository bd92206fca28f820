//! The closed set of marketplace service types.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EngineError;

/// Service offered in a zone. Stored as its snake_case slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    MedicineDelivery,
    DoctorConsultation,
    Diagnostics,
    Ambulance,
    BloodBank,
    Physiotherapy,
    HomeCare,
    Nursing,
    Telemedicine,
}

impl ServiceType {
    pub const ALL: [ServiceType; 9] = [
        ServiceType::MedicineDelivery,
        ServiceType::DoctorConsultation,
        ServiceType::Diagnostics,
        ServiceType::Ambulance,
        ServiceType::BloodBank,
        ServiceType::Physiotherapy,
        ServiceType::HomeCare,
        ServiceType::Nursing,
        ServiceType::Telemedicine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::MedicineDelivery => "medicine_delivery",
            ServiceType::DoctorConsultation => "doctor_consultation",
            ServiceType::Diagnostics => "diagnostics",
            ServiceType::Ambulance => "ambulance",
            ServiceType::BloodBank => "blood_bank",
            ServiceType::Physiotherapy => "physiotherapy",
            ServiceType::HomeCare => "home_care",
            ServiceType::Nursing => "nursing",
            ServiceType::Telemedicine => "telemedicine",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        ServiceType::ALL
            .into_iter()
            .find(|service_type| service_type.as_str() == normalized)
            .ok_or_else(|| EngineError::UnknownServiceType(value.to_string()))
    }
}
