//! Service specific configuration carried alongside the common fields.
//!
//! Each of the known service types has its own typed options. Keys nobody
//! has modelled yet survive in `extra`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::ServiceType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicineDeliveryOptions {
    pub cold_chain: bool,
    pub express_available: bool,
    pub max_items: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsultationOptions {
    pub specialities: Vec<String>,
    pub consultation_minutes: u32,
    pub video_supported: bool,
}

impl Default for ConsultationOptions {
    fn default() -> Self {
        Self {
            specialities: vec!["general_physician".to_string()],
            consultation_minutes: 15,
            video_supported: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsOptions {
    pub home_sample_collection: bool,
    pub report_turnaround_hours: u32,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            home_sample_collection: true,
            report_turnaround_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbulanceOptions {
    pub vehicle_types: Vec<String>,
    pub response_time_minutes: u32,
    pub oxygen_supported: bool,
}

impl Default for AmbulanceOptions {
    fn default() -> Self {
        Self {
            vehicle_types: vec!["basic_life_support".to_string()],
            response_time_minutes: 15,
            oxygen_supported: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloodBankOptions {
    pub blood_groups: Vec<String>,
    pub cross_matching: bool,
}

impl Default for BloodBankOptions {
    fn default() -> Self {
        Self {
            blood_groups: ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"]
                .iter()
                .map(|group| group.to_string())
                .collect(),
            cross_matching: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysiotherapyOptions {
    pub session_minutes: u32,
    pub home_visits: bool,
}

impl Default for PhysiotherapyOptions {
    fn default() -> Self {
        Self {
            session_minutes: 45,
            home_visits: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeCareOptions {
    pub min_visit_hours: u32,
    pub services: Vec<String>,
}

impl Default for HomeCareOptions {
    fn default() -> Self {
        Self {
            min_visit_hours: 2,
            services: vec!["elderly_care".to_string(), "post_operative_care".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NursingOptions {
    pub shift_hours: Vec<u32>,
    pub icu_trained: bool,
}

impl Default for NursingOptions {
    fn default() -> Self {
        Self {
            shift_hours: vec![8, 12, 24],
            icu_trained: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemedicineOptions {
    pub platforms: Vec<String>,
    pub max_call_minutes: u32,
}

impl Default for TelemedicineOptions {
    fn default() -> Self {
        Self {
            platforms: vec!["video".to_string(), "audio".to_string()],
            max_call_minutes: 20,
        }
    }
}

/// Typed options, tagged by `service_type` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service_type", rename_all = "snake_case")]
pub enum ServiceOptions {
    MedicineDelivery(MedicineDeliveryOptions),
    DoctorConsultation(ConsultationOptions),
    Diagnostics(DiagnosticsOptions),
    Ambulance(AmbulanceOptions),
    BloodBank(BloodBankOptions),
    Physiotherapy(PhysiotherapyOptions),
    HomeCare(HomeCareOptions),
    Nursing(NursingOptions),
    Telemedicine(TelemedicineOptions),
}

impl ServiceOptions {
    pub fn default_for(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::MedicineDelivery => {
                ServiceOptions::MedicineDelivery(MedicineDeliveryOptions::default())
            }
            ServiceType::DoctorConsultation => {
                ServiceOptions::DoctorConsultation(ConsultationOptions::default())
            }
            ServiceType::Diagnostics => ServiceOptions::Diagnostics(DiagnosticsOptions::default()),
            ServiceType::Ambulance => ServiceOptions::Ambulance(AmbulanceOptions::default()),
            ServiceType::BloodBank => ServiceOptions::BloodBank(BloodBankOptions::default()),
            ServiceType::Physiotherapy => {
                ServiceOptions::Physiotherapy(PhysiotherapyOptions::default())
            }
            ServiceType::HomeCare => ServiceOptions::HomeCare(HomeCareOptions::default()),
            ServiceType::Nursing => ServiceOptions::Nursing(NursingOptions::default()),
            ServiceType::Telemedicine => {
                ServiceOptions::Telemedicine(TelemedicineOptions::default())
            }
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceOptions::MedicineDelivery(_) => ServiceType::MedicineDelivery,
            ServiceOptions::DoctorConsultation(_) => ServiceType::DoctorConsultation,
            ServiceOptions::Diagnostics(_) => ServiceType::Diagnostics,
            ServiceOptions::Ambulance(_) => ServiceType::Ambulance,
            ServiceOptions::BloodBank(_) => ServiceType::BloodBank,
            ServiceOptions::Physiotherapy(_) => ServiceType::Physiotherapy,
            ServiceOptions::HomeCare(_) => ServiceType::HomeCare,
            ServiceOptions::Nursing(_) => ServiceType::Nursing,
            ServiceOptions::Telemedicine(_) => ServiceType::Telemedicine,
        }
    }
}

/// Stored `custom_config` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceExtension {
    #[serde(flatten)]
    pub options: ServiceOptions,
    /// Untyped keys kept verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, JsonValue>,
}

impl ServiceExtension {
    pub fn default_for(service_type: ServiceType) -> Self {
        Self {
            options: ServiceOptions::default_for(service_type),
            extra: BTreeMap::new(),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.options.service_type()
    }

    /// Decode a stored value. Rows written before typing existed carry an
    /// untagged map; those keep their keys in `extra` under the default options.
    pub fn from_stored(service_type: ServiceType, value: &JsonValue) -> Result<Self, String> {
        match value {
            JsonValue::Null => Ok(Self::default_for(service_type)),
            JsonValue::Object(map) if !map.contains_key("service_type") => Ok(Self {
                options: ServiceOptions::default_for(service_type),
                extra: map.clone().into_iter().collect(),
            }),
            other => serde_json::from_value(other.clone())
                .map_err(|err| format!("invalid custom_config: {err}")),
        }
    }
}
