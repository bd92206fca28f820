//! Hourly capacity against existing bookings.
//!
//! Capacity is counted per local wall clock hour. When the requested hour is
//! full (or the service is closed then), the following hours are probed one
//! at a time until a free operational hour turns up or the lookahead runs out.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::config::ServiceSettings;
use super::{ServiceType, is_operational_within};
use crate::db::to_db_time;
use crate::models::service_booking::{self, Entity as ServiceBooking};

pub const BOOKING_STATUS_CANCELLED: &str = "cancelled";

/// Source of booking counts. Cancelled bookings never count.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings with `from <= slot_start < to`.
    async fn count_bookings(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, DbErr>;
}

pub type SharedBookingStore = Arc<dyn BookingStore>;

/// Reads `service_bookings`.
#[derive(Debug, Clone)]
pub struct DbBookingStore {
    db: Arc<DatabaseConnection>,
}

impl DbBookingStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingStore for DbBookingStore {
    async fn count_bookings(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        ServiceBooking::find()
            .filter(service_booking::Column::ZoneId.eq(zone_id))
            .filter(service_booking::Column::ServiceType.eq(service_type.as_str()))
            .filter(service_booking::Column::Status.ne(BOOKING_STATUS_CANCELLED))
            .filter(service_booking::Column::SlotStart.gte(to_db_time(from)))
            .filter(service_booking::Column::SlotStart.lt(to_db_time(to)))
            .count(self.db.as_ref())
            .await
    }
}

#[derive(Debug, Clone)]
struct HeldBooking {
    zone_id: Uuid,
    service_type: ServiceType,
    slot_start: DateTime<Utc>,
    cancelled: bool,
}

/// Process local store for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<Vec<HeldBooking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, zone_id: Uuid, service_type: ServiceType, slot_start: DateTime<Utc>) {
        self.push(zone_id, service_type, slot_start, false);
    }

    pub fn add_cancelled(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        slot_start: DateTime<Utc>,
    ) {
        self.push(zone_id, service_type, slot_start, true);
    }

    fn push(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        slot_start: DateTime<Utc>,
        cancelled: bool,
    ) {
        let mut bookings = self
            .bookings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        bookings.push(HeldBooking {
            zone_id,
            service_type,
            slot_start,
            cancelled,
        });
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn count_bookings(
        &self,
        zone_id: Uuid,
        service_type: ServiceType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let bookings = self
            .bookings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(bookings
            .iter()
            .filter(|booking| {
                booking.zone_id == zone_id
                    && booking.service_type == service_type
                    && !booking.cancelled
                    && booking.slot_start >= from
                    && booking.slot_start < to
            })
            .count() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CapacityStatus {
    pub available: bool,
    pub available_slots: u32,
    pub total_capacity: u32,
    /// Start of the hour bucket the request falls in.
    pub requested_slot: DateTime<Utc>,
    /// The requested bucket when it has room, otherwise the first later
    /// operational bucket with room. `None` when nothing is free within
    /// the lookahead.
    pub next_available_slot: Option<DateTime<Utc>>,
}

/// Inputs that stay fixed across one capacity check.
pub struct CapacityQuery<'a> {
    pub zone_id: Uuid,
    pub service_type: ServiceType,
    pub settings: &'a ServiceSettings,
    pub offset: FixedOffset,
    pub max_lookahead_hours: u32,
}

impl CapacityQuery<'_> {
    fn lookahead_hours(&self) -> u32 {
        self.max_lookahead_hours
            .min(self.settings.advance_booking_days.saturating_mul(24))
    }

    /// Free slots in the bucket starting at `start` (local). Zero when the
    /// service is closed for the whole hour.
    async fn free_slots(
        &self,
        store: &dyn BookingStore,
        start: DateTime<FixedOffset>,
    ) -> Result<u32, DbErr> {
        if !is_operational_within(
            &self.settings.operating_hours,
            start.naive_local(),
            Duration::hours(1),
        ) {
            return Ok(0);
        }
        let from = start.to_utc();
        let booked = store
            .count_bookings(self.zone_id, self.service_type, from, from + Duration::hours(1))
            .await?;
        let booked = u32::try_from(booked).unwrap_or(u32::MAX);
        Ok(self.settings.capacity_per_hour.saturating_sub(booked))
    }
}

pub async fn check_capacity(
    store: &dyn BookingStore,
    query: &CapacityQuery<'_>,
    requested: DateTime<Utc>,
) -> Result<CapacityStatus, DbErr> {
    let bucket = hour_bucket(requested.with_timezone(&query.offset), query.offset);
    let available_slots = query.free_slots(store, bucket).await?;
    let requested_slot = bucket.to_utc();

    if available_slots > 0 {
        return Ok(CapacityStatus {
            available: true,
            available_slots,
            total_capacity: query.settings.capacity_per_hour,
            requested_slot,
            next_available_slot: Some(requested_slot),
        });
    }

    let mut next_available_slot = None;
    for step in 1..=i64::from(query.lookahead_hours()) {
        let candidate = bucket + Duration::hours(step);
        if query.free_slots(store, candidate).await? > 0 {
            next_available_slot = Some(candidate.to_utc());
            break;
        }
    }

    Ok(CapacityStatus {
        available: false,
        available_slots: 0,
        total_capacity: query.settings.capacity_per_hour,
        requested_slot,
        next_available_slot,
    })
}

fn hour_bucket(local: DateTime<FixedOffset>, offset: FixedOffset) -> DateTime<FixedOffset> {
    let naive: NaiveDateTime = local.naive_local();
    let truncated = naive
        .with_minute(0)
        .and_then(|value| value.with_second(0))
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(naive);
    offset
        .from_local_datetime(&truncated)
        .single()
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::defaults::default_template;
    use crate::zones::schedule::{ClockTime, DaySchedule, OperatingHours};

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
    }

    fn settings(capacity: u32, open: u32, close: u32) -> ServiceSettings {
        let mut settings = default_template(ServiceType::Diagnostics).settings;
        settings.capacity_per_hour = capacity;
        settings.advance_booking_days = 3;
        settings.operating_hours = OperatingHours::every_day(DaySchedule::new(
            ClockTime::hm(open, 0).unwrap(),
            ClockTime::hm(close, 0).unwrap(),
        ));
        settings
    }

    fn query(settings: &ServiceSettings, zone_id: Uuid) -> CapacityQuery<'_> {
        CapacityQuery {
            zone_id,
            service_type: ServiceType::Diagnostics,
            settings,
            offset: FixedOffset::east_opt(0).unwrap(),
            max_lookahead_hours: 72,
        }
    }

    #[tokio::test]
    async fn free_hour_reports_remaining_slots() {
        let zone_id = Uuid::new_v4();
        let store = InMemoryBookingStore::new();
        store.add(zone_id, ServiceType::Diagnostics, utc(6, 10, 15));
        store.add(zone_id, ServiceType::Diagnostics, utc(6, 10, 45));
        store.add_cancelled(zone_id, ServiceType::Diagnostics, utc(6, 10, 30));
        store.add(Uuid::new_v4(), ServiceType::Diagnostics, utc(6, 10, 5));

        let settings = settings(3, 8, 20);
        let status = check_capacity(&store, &query(&settings, zone_id), utc(6, 10, 20))
            .await
            .unwrap();

        assert!(status.available);
        assert_eq!(status.available_slots, 1);
        assert_eq!(status.total_capacity, 3);
        assert_eq!(status.requested_slot, utc(6, 10, 0));
        assert_eq!(status.next_available_slot, Some(utc(6, 10, 0)));
    }

    #[tokio::test]
    async fn full_hour_scans_past_full_buckets() {
        let zone_id = Uuid::new_v4();
        let store = InMemoryBookingStore::new();
        for hour in [10, 11, 12] {
            store.add(zone_id, ServiceType::Diagnostics, utc(6, hour, 0));
        }

        let settings = settings(1, 8, 20);
        let status = check_capacity(&store, &query(&settings, zone_id), utc(6, 10, 30))
            .await
            .unwrap();

        assert!(!status.available);
        assert_eq!(status.available_slots, 0);
        assert_eq!(status.next_available_slot, Some(utc(6, 13, 0)));
    }

    #[tokio::test]
    async fn scan_skips_closed_hours() {
        let zone_id = Uuid::new_v4();
        let store = InMemoryBookingStore::new();
        store.add(zone_id, ServiceType::Diagnostics, utc(6, 19, 0));

        let settings = settings(1, 8, 20);
        let status = check_capacity(&store, &query(&settings, zone_id), utc(6, 19, 10))
            .await
            .unwrap();

        assert_eq!(status.next_available_slot, Some(utc(7, 8, 0)));
    }

    #[tokio::test]
    async fn exhausted_lookahead_reports_none() {
        let zone_id = Uuid::new_v4();
        let store = InMemoryBookingStore::new();
        let mut settings = settings(1, 8, 20);
        settings.advance_booking_days = 1;
        for hour in 10..20 {
            store.add(zone_id, ServiceType::Diagnostics, utc(6, hour, 0));
        }
        for hour in 8..20 {
            store.add(zone_id, ServiceType::Diagnostics, utc(7, hour, 0));
        }

        let status = check_capacity(&store, &query(&settings, zone_id), utc(6, 10, 0))
            .await
            .unwrap();

        assert!(!status.available);
        assert_eq!(status.next_available_slot, None);
    }

    #[tokio::test]
    async fn buckets_follow_local_offset() {
        let zone_id = Uuid::new_v4();
        let store = InMemoryBookingStore::new();
        // 10:00 IST is 04:30 UTC
        store.add(zone_id, ServiceType::Diagnostics, utc(6, 4, 40));

        let settings = settings(1, 8, 20);
        let mut query = query(&settings, zone_id);
        query.offset = FixedOffset::east_opt(330 * 60).unwrap();

        let status = check_capacity(&store, &query, utc(6, 4, 50)).await.unwrap();

        assert_eq!(status.requested_slot, utc(6, 4, 30));
        assert!(!status.available);
        assert_eq!(status.next_available_slot, Some(utc(6, 5, 30)));
    }

    #[tokio::test]
    async fn partially_open_hours_count_as_bookable() {
        let zone_id = Uuid::new_v4();
        let store = InMemoryBookingStore::new();
        let mut settings = settings(2, 8, 20);
        settings.operating_hours = OperatingHours::every_day(
            DaySchedule::new(ClockTime::hm(8, 30).unwrap(), ClockTime::hm(20, 0).unwrap())
                .with_break(ClockTime::hm(13, 0).unwrap(), ClockTime::hm(13, 15).unwrap()),
        );

        let opening = check_capacity(&store, &query(&settings, zone_id), utc(6, 8, 40))
            .await
            .unwrap();
        assert!(opening.available);
        assert_eq!(opening.requested_slot, utc(6, 8, 0));

        let after_break = check_capacity(&store, &query(&settings, zone_id), utc(6, 13, 5))
            .await
            .unwrap();
        assert!(after_break.available);
        assert_eq!(after_break.available_slots, 2);

        let before_opening = check_capacity(&store, &query(&settings, zone_id), utc(6, 7, 50))
            .await
            .unwrap();
        assert!(!before_opening.available);
        assert_eq!(before_opening.next_available_slot, Some(utc(6, 8, 0)));
    }
}
