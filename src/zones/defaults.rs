//! Built in templates used when a zone is provisioned without explicit values.

use rust_decimal::{Decimal, dec};

use super::config::{AgeRestrictions, ServiceSettings, ZoneServiceConfigTemplate};
use super::schedule::{ClockTime, DaySchedule, OperatingHours};
use super::{ServiceExtension, ServiceType};

struct Shape {
    delivery_fee: Decimal,
    min_order_amount: Decimal,
    max_order_amount: Option<Decimal>,
    peak_hour_multiplier: Decimal,
    distance_based_pricing: bool,
    estimated_delivery_time: &'static str,
    hours: OperatingHours,
    capacity_per_hour: u32,
    staff_required: u32,
    equipment: &'static [&'static str],
    advance_booking_days: u32,
    emergency_available: bool,
    prescription_required: bool,
    age_restrictions: Option<AgeRestrictions>,
    special_requirements: &'static [&'static str],
}

fn hours(open: (u32, u32), close: (u32, u32)) -> OperatingHours {
    match (ClockTime::hm(open.0, open.1), ClockTime::hm(close.0, close.1)) {
        (Some(open), Some(close)) => OperatingHours::every_day(DaySchedule::new(open, close)),
        _ => OperatingHours::default(),
    }
}

fn round_the_clock() -> OperatingHours {
    hours((0, 0), (23, 59))
}

fn shape(service_type: ServiceType) -> Shape {
    match service_type {
        ServiceType::MedicineDelivery => Shape {
            delivery_fee: dec!(30),
            min_order_amount: dec!(100),
            max_order_amount: Some(dec!(25000)),
            peak_hour_multiplier: dec!(1.2),
            distance_based_pricing: true,
            estimated_delivery_time: "30-45 mins",
            hours: hours((8, 0), (22, 0)),
            capacity_per_hour: 50,
            staff_required: 2,
            equipment: &["delivery_bag"],
            advance_booking_days: 1,
            emergency_available: true,
            prescription_required: true,
            age_restrictions: None,
            special_requirements: &[],
        },
        ServiceType::DoctorConsultation => Shape {
            delivery_fee: dec!(0),
            min_order_amount: dec!(300),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: false,
            estimated_delivery_time: "15-30 mins",
            hours: hours((9, 0), (21, 0)),
            capacity_per_hour: 4,
            staff_required: 1,
            equipment: &[],
            advance_booking_days: 14,
            emergency_available: false,
            prescription_required: false,
            age_restrictions: None,
            special_requirements: &[],
        },
        ServiceType::Diagnostics => Shape {
            delivery_fee: dec!(50),
            min_order_amount: dec!(200),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.1),
            distance_based_pricing: true,
            estimated_delivery_time: "Sample collection within 2 hours",
            hours: hours((6, 0), (20, 0)),
            capacity_per_hour: 10,
            staff_required: 1,
            equipment: &["sample_collection_kit", "cold_box"],
            advance_booking_days: 7,
            emergency_available: false,
            prescription_required: false,
            age_restrictions: None,
            special_requirements: &["fasting may be required"],
        },
        ServiceType::Ambulance => Shape {
            delivery_fee: dec!(500),
            min_order_amount: dec!(0),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: true,
            estimated_delivery_time: "10-20 mins",
            hours: round_the_clock(),
            capacity_per_hour: 5,
            staff_required: 2,
            equipment: &["stretcher", "oxygen_cylinder", "first_aid_kit"],
            advance_booking_days: 1,
            emergency_available: true,
            prescription_required: false,
            age_restrictions: None,
            special_requirements: &[],
        },
        ServiceType::BloodBank => Shape {
            delivery_fee: dec!(100),
            min_order_amount: dec!(0),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: true,
            estimated_delivery_time: "1-2 hours",
            hours: round_the_clock(),
            capacity_per_hour: 10,
            staff_required: 1,
            equipment: &["blood_transport_box"],
            advance_booking_days: 2,
            emergency_available: true,
            prescription_required: true,
            age_restrictions: None,
            special_requirements: &["requisition form from treating doctor"],
        },
        ServiceType::Physiotherapy => Shape {
            delivery_fee: dec!(100),
            min_order_amount: dec!(500),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: true,
            estimated_delivery_time: "Scheduled visit",
            hours: hours((7, 0), (20, 0)),
            capacity_per_hour: 3,
            staff_required: 1,
            equipment: &["therapy_kit"],
            advance_booking_days: 14,
            emergency_available: false,
            prescription_required: false,
            age_restrictions: None,
            special_requirements: &[],
        },
        ServiceType::HomeCare => Shape {
            delivery_fee: dec!(150),
            min_order_amount: dec!(1000),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: false,
            estimated_delivery_time: "Scheduled visit",
            hours: hours((8, 0), (20, 0)),
            capacity_per_hour: 2,
            staff_required: 1,
            equipment: &[],
            advance_booking_days: 30,
            emergency_available: false,
            prescription_required: false,
            age_restrictions: None,
            special_requirements: &[],
        },
        ServiceType::Nursing => Shape {
            delivery_fee: dec!(200),
            min_order_amount: dec!(800),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: false,
            estimated_delivery_time: "Within 4 hours",
            hours: round_the_clock(),
            capacity_per_hour: 2,
            staff_required: 1,
            equipment: &["nursing_kit"],
            advance_booking_days: 30,
            emergency_available: true,
            prescription_required: false,
            age_restrictions: None,
            special_requirements: &[],
        },
        ServiceType::Telemedicine => Shape {
            delivery_fee: dec!(0),
            min_order_amount: dec!(199),
            max_order_amount: None,
            peak_hour_multiplier: dec!(1.0),
            distance_based_pricing: false,
            estimated_delivery_time: "Instant",
            hours: hours((7, 0), (23, 0)),
            capacity_per_hour: 20,
            staff_required: 1,
            equipment: &[],
            advance_booking_days: 7,
            emergency_available: false,
            prescription_required: false,
            age_restrictions: Some(AgeRestrictions {
                min: Some(18),
                max: None,
            }),
            special_requirements: &["stable internet connection"],
        },
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Template for `service_type`. Enabled, with the service's typed defaults.
pub fn default_template(service_type: ServiceType) -> ZoneServiceConfigTemplate {
    let shape = shape(service_type);

    ZoneServiceConfigTemplate {
        service_type,
        settings: ServiceSettings {
            is_enabled: true,
            delivery_fee: shape.delivery_fee,
            min_order_amount: shape.min_order_amount,
            max_order_amount: shape.max_order_amount,
            peak_hour_multiplier: shape.peak_hour_multiplier,
            distance_based_pricing: shape.distance_based_pricing,
            estimated_delivery_time: shape.estimated_delivery_time.to_string(),
            operating_hours: shape.hours,
            capacity_per_hour: shape.capacity_per_hour,
            staff_required: shape.staff_required,
            equipment_required: owned(shape.equipment),
            advance_booking_days: shape.advance_booking_days,
            emergency_available: shape.emergency_available,
            prescription_required: shape.prescription_required,
            age_restrictions: shape.age_restrictions,
            special_requirements: owned(shape.special_requirements),
            custom_config: ServiceExtension::default_for(service_type),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn every_type_has_a_schedule_for_each_day() {
        for service_type in ServiceType::ALL {
            let template = default_template(service_type);
            for day in [Weekday::Mon, Weekday::Sat, Weekday::Sun] {
                assert!(
                    template.settings.operating_hours.for_day(day).is_some(),
                    "{service_type} has no {day} schedule"
                );
            }
        }
    }

    #[test]
    fn emergency_services_run_overnight() {
        let template = default_template(ServiceType::Ambulance);
        let monday = template
            .settings
            .operating_hours
            .for_day(Weekday::Mon)
            .unwrap();

        assert!(monday.is_open_at(chrono::NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
    }
}
