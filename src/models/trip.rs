use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use super::{round2, settings::AppSettings};
use crate::error::AppError;

/// A trip that has been started but not finished yet.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrip {
    pub start_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    pub start_odometer: f64,
    pub note: Option<String>,
}

impl ActiveTrip {
    pub fn start(start_odometer: f64, note: Option<&str>, now: NaiveDateTime) -> Result<Self, AppError> {
        if !start_odometer.is_finite() || start_odometer < 0.0 {
            return Err(AppError::Validation(
                "start odometer must be a non-negative number".into(),
            ));
        }
        Ok(Self {
            start_date: now.date(),
            start_time: truncate_to_minute(now.time()),
            start_odometer,
            note: normalize_note(note),
        })
    }

    pub fn note_display(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }
}

/// A completed trip. Cost and fuel are snapshotted from the settings in force when it ended.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub start_odometer: f64,
    pub end_odometer: f64,
    pub distance_km: f64,
    pub fuel_price_at_time: f64,
    pub consumption_at_time: f64,
    pub fuel_consumed: f64,
    pub total_cost: f64,
    pub note: Option<String>,
}

impl Trip {
    /// Finishes `active` at `end_odometer`, costing it with `settings`.
    ///
    /// A non-empty `end_note` replaces the note captured at the start.
    pub fn complete(
        active: &ActiveTrip,
        end_odometer: f64,
        end_note: Option<&str>,
        settings: &AppSettings,
        now: NaiveDateTime,
    ) -> Result<Self, AppError> {
        if !end_odometer.is_finite() {
            return Err(AppError::Validation("end odometer must be a number".into()));
        }
        if end_odometer <= active.start_odometer {
            return Err(AppError::Ordering {
                start: active.start_odometer,
                end: end_odometer,
            });
        }

        let distance_km = round2(end_odometer - active.start_odometer);
        let fuel_consumed = round2(distance_km / 100.0 * settings.average_consumption);
        let total_cost = round2(fuel_consumed * settings.fuel_price);

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            date: active.start_date,
            start_time: active.start_time,
            end_time: truncate_to_minute(now.time()),
            start_odometer: active.start_odometer,
            end_odometer,
            distance_km,
            fuel_price_at_time: settings.fuel_price,
            consumption_at_time: settings.average_consumption,
            fuel_consumed,
            total_cost,
            note: normalize_note(end_note).or_else(|| active.note.clone()),
        })
    }

    pub fn note_display(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Wall-clock times are stored as `HH:MM`.
mod clock_time {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(hour, minute, 42)
            .unwrap()
    }

    #[test]
    fn start_rejects_negative_and_non_finite_odometer() {
        assert!(matches!(
            ActiveTrip::start(-1.0, None, at(8, 0)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ActiveTrip::start(f64::NAN, None, at(8, 0)),
            Err(AppError::Validation(_))
        ));
        let active = ActiveTrip::start(0.0, Some("  "), at(8, 0)).unwrap();
        assert_eq!(active.note, None);
        assert_eq!(active.start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn complete_computes_rounded_snapshot() {
        let active = ActiveTrip::start(1000.0, Some("commute"), at(8, 0)).unwrap();
        let trip =
            Trip::complete(&active, 1050.0, None, &AppSettings::default(), at(8, 45)).unwrap();

        assert_eq!(trip.distance_km, 50.0);
        assert_eq!(trip.fuel_consumed, 3.25);
        assert_eq!(trip.total_cost, 5.36);
        assert_eq!(trip.fuel_price_at_time, 1.65);
        assert_eq!(trip.consumption_at_time, 6.5);
        assert_eq!(trip.date, active.start_date);
        assert_eq!(trip.end_time, NaiveTime::from_hms_opt(8, 45, 0).unwrap());
        assert_eq!(trip.note.as_deref(), Some("commute"));
    }

    #[test]
    fn rounding_is_applied_at_each_step() {
        let settings = AppSettings::new(1.799, 7.3).unwrap();
        let active = ActiveTrip::start(100.004, None, at(9, 0)).unwrap();
        let trip = Trip::complete(&active, 133.337, None, &settings, at(9, 30)).unwrap();

        assert_eq!(trip.distance_km, round2(133.337 - 100.004));
        let fuel = round2(trip.distance_km / 100.0 * 7.3);
        assert_eq!(trip.fuel_consumed, fuel);
        assert_eq!(trip.total_cost, round2(fuel * 1.799));
    }

    #[test]
    fn complete_rejects_non_increasing_odometer() {
        let active = ActiveTrip::start(1000.0, None, at(8, 0)).unwrap();
        let settings = AppSettings::default();
        assert!(matches!(
            Trip::complete(&active, 999.0, None, &settings, at(9, 0)),
            Err(AppError::Ordering { .. })
        ));
        assert!(matches!(
            Trip::complete(&active, 1000.0, None, &settings, at(9, 0)),
            Err(AppError::Ordering { .. })
        ));
        assert!(matches!(
            Trip::complete(&active, f64::INFINITY, None, &settings, at(9, 0)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn end_note_overrides_start_note_only_when_non_blank() {
        let active = ActiveTrip::start(10.0, Some("start"), at(8, 0)).unwrap();
        let settings = AppSettings::default();

        let kept = Trip::complete(&active, 20.0, Some("   "), &settings, at(9, 0)).unwrap();
        assert_eq!(kept.note.as_deref(), Some("start"));

        let replaced = Trip::complete(&active, 20.0, Some(" end "), &settings, at(9, 0)).unwrap();
        assert_eq!(replaced.note.as_deref(), Some("end"));
    }

    #[test]
    fn json_layout_uses_camel_case_and_clock_times() {
        let active = ActiveTrip::start(1000.0, None, at(7, 5)).unwrap();
        let json = serde_json::to_value(&active).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startDate": "2024-05-17",
                "startTime": "07:05",
                "startOdometer": 1000.0,
            })
        );

        let trip = Trip::complete(&active, 1020.0, Some("shop"), &AppSettings::default(), at(7, 30))
            .unwrap();
        let json = serde_json::to_value(&trip).unwrap();
        assert_eq!(json["distanceKm"], 20.0);
        assert_eq!(json["endTime"], "07:30");
        assert_eq!(json["note"], "shop");
        let back: Trip = serde_json::from_value(json).unwrap();
        assert_eq!(back, trip);
    }

    proptest! {
        #[test]
        fn derived_fields_follow_the_rounding_chain(
            start in 0.0f64..1_000_000.0,
            delta in 0.01f64..5_000.0,
            price in 0.01f64..10.0,
            consumption in 0.1f64..40.0,
        ) {
            let end = start + delta;
            let settings = AppSettings::new(price, consumption).unwrap();
            let active = ActiveTrip::start(start, None, at(8, 0)).unwrap();
            let trip = Trip::complete(&active, end, None, &settings, at(9, 0)).unwrap();

            let distance = round2(end - start);
            let fuel = round2(distance / 100.0 * consumption);
            prop_assert_eq!(trip.distance_km, distance);
            prop_assert_eq!(trip.fuel_consumed, fuel);
            prop_assert_eq!(trip.total_cost, round2(fuel * price));
        }

        #[test]
        fn end_at_or_below_start_is_rejected(
            start in 0.0f64..1_000_000.0,
            back in 0.0f64..1_000_000.0,
        ) {
            let active = ActiveTrip::start(start, None, at(8, 0)).unwrap();
            let result = Trip::complete(&active, start - back, None, &AppSettings::default(), at(9, 0));
            let is_ordering_err = matches!(result, Err(AppError::Ordering { .. }));
            prop_assert!(is_ordering_err);
        }
    }
}
