//! Weekly operating hours and the operational check.
//!
//! Times are local wall clock `HH:MM`. A day is open on `[open, close)` and a
//! break closes `[start, end)` within it.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

/// Wall clock time serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ToSchema)]
#[schema(value_type = String, example = "08:00")]
pub struct ClockTime(pub NaiveTime);

impl ClockTime {
    pub fn hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn parse(value: &str) -> Option<Self> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").ok().map(Self)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.format("%H:%M").to_string())
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ClockTime::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid HH:MM time '{raw}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakPeriod {
    pub start: ClockTime,
    pub end: ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DaySchedule {
    pub open: ClockTime,
    pub close: ClockTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaks: Vec<BreakPeriod>,
}

impl DaySchedule {
    pub fn new(open: ClockTime, close: ClockTime) -> Self {
        Self {
            open,
            close,
            breaks: Vec::new(),
        }
    }

    pub fn with_break(mut self, start: ClockTime, end: ClockTime) -> Self {
        self.breaks.push(BreakPeriod { start, end });
        self
    }

    pub fn is_open_at(&self, time: NaiveTime) -> bool {
        if time < self.open.0 || time >= self.close.0 {
            return false;
        }
        !self
            .breaks
            .iter()
            .any(|period| time >= period.start.0 && time < period.end.0)
    }

    /// Whether the day is open at any moment in `[from, from + span)`.
    ///
    /// The open set only starts at `open` or at a break end, so those and
    /// `from` itself are the only instants worth testing.
    pub fn is_open_within(&self, from: NaiveTime, span: Duration) -> bool {
        std::iter::once(from)
            .chain(std::iter::once(self.open.0))
            .chain(self.breaks.iter().map(|period| period.end.0))
            .filter(|time| *time >= from && time.signed_duration_since(from) < span)
            .any(|time| self.is_open_at(time))
    }

    fn validate(&self, day: &str) -> Result<(), String> {
        if self.open >= self.close {
            return Err(format!("{day}: open must be before close"));
        }
        for period in &self.breaks {
            if period.start >= period.end {
                return Err(format!("{day}: break start must be before end"));
            }
            if period.start < self.open || period.end > self.close {
                return Err(format!("{day}: breaks must fall within opening hours"));
            }
        }
        Ok(())
    }
}

/// Lowercase weekday key as used in stored schedules.
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

const WEEKDAY_KEYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Weekly schedule keyed by lowercase weekday name. Missing days are closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperatingHours(pub BTreeMap<String, DaySchedule>);

impl OperatingHours {
    /// Same schedule on every day of the week.
    pub fn every_day(schedule: DaySchedule) -> Self {
        Self(
            WEEKDAY_KEYS
                .iter()
                .map(|day| (day.to_string(), schedule.clone()))
                .collect(),
        )
    }

    pub fn with_day(mut self, day: Weekday, schedule: DaySchedule) -> Self {
        self.0.insert(weekday_key(day).to_string(), schedule);
        self
    }

    pub fn without_day(mut self, day: Weekday) -> Self {
        self.0.remove(weekday_key(day));
        self
    }

    pub fn for_day(&self, day: Weekday) -> Option<&DaySchedule> {
        self.0.get(weekday_key(day))
    }

    pub fn validate(&self) -> Result<(), String> {
        for (day, schedule) in &self.0 {
            if !WEEKDAY_KEYS.contains(&day.as_str()) {
                return Err(format!("unknown weekday '{day}'"));
            }
            schedule.validate(day)?;
        }
        Ok(())
    }
}

/// Whether a service with `hours` is operating at local time `at`.
pub fn is_service_operational(hours: &OperatingHours, at: NaiveDateTime) -> bool {
    hours
        .for_day(at.weekday())
        .is_some_and(|schedule| schedule.is_open_at(at.time()))
}

/// Whether the service is open at any moment in local `[from, from + span)`.
///
/// `span` must not cross midnight.
pub fn is_operational_within(hours: &OperatingHours, from: NaiveDateTime, span: Duration) -> bool {
    hours
        .for_day(from.weekday())
        .is_some_and(|schedule| schedule.is_open_within(from.time(), span))
}
