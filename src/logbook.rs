//! In-memory trip logbook: settings, the ledger of completed trips and the
//! trip in progress. Nothing here touches storage; callers persist after
//! each successful mutation.

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use crate::{
    error::AppError,
    models::{
        settings::AppSettings,
        stats::HistoryStats,
        trip::{ActiveTrip, Trip},
    },
};

#[derive(Debug, Clone, Default)]
pub struct Logbook {
    settings: AppSettings,
    /// Newest first.
    trips: Vec<Trip>,
    active_trip: Option<ActiveTrip>,
}

impl Logbook {
    pub fn new(settings: AppSettings, trips: Vec<Trip>, active_trip: Option<ActiveTrip>) -> Self {
        Self {
            settings,
            trips,
            active_trip,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn active_trip(&self) -> Option<&ActiveTrip> {
        self.active_trip.as_ref()
    }

    pub fn start_trip(&mut self, start_odometer: f64, note: Option<&str>) -> Result<ActiveTrip, AppError> {
        self.start_trip_at(start_odometer, note, Local::now().naive_local())
    }

    pub fn start_trip_at(
        &mut self,
        start_odometer: f64,
        note: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<ActiveTrip, AppError> {
        if self.active_trip.is_some() {
            return Err(AppError::TripInProgress);
        }
        let active = ActiveTrip::start(start_odometer, note, now)?;
        debug!(start_odometer, "trip started");
        self.active_trip = Some(active.clone());
        Ok(active)
    }

    pub fn end_trip(&mut self, end_odometer: f64, note: Option<&str>) -> Result<Trip, AppError> {
        self.end_trip_at(end_odometer, note, Local::now().naive_local())
    }

    /// Completes the active trip with the current settings as its cost snapshot.
    /// On any error the active trip is left untouched.
    pub fn end_trip_at(
        &mut self,
        end_odometer: f64,
        note: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Trip, AppError> {
        let active = self.active_trip.as_ref().ok_or(AppError::NoActiveTrip)?;
        let trip = Trip::complete(active, end_odometer, note, &self.settings, now)?;
        debug!(id = %trip.id, distance_km = trip.distance_km, "trip completed");
        self.add_trip(trip.clone());
        self.active_trip = None;
        Ok(trip)
    }

    pub fn add_trip(&mut self, trip: Trip) {
        self.trips.insert(0, trip);
    }

    /// Removes the trip with `id`. Returns whether anything was removed.
    pub fn delete_trip(&mut self, id: &str) -> bool {
        let before = self.trips.len();
        self.trips.retain(|trip| trip.id != id);
        before != self.trips.len()
    }

    pub fn recent_trips(&self, n: usize) -> &[Trip] {
        &self.trips[..n.min(self.trips.len())]
    }

    /// Odometer reading a fresh trip most likely starts from.
    pub fn last_end_odometer(&self) -> Option<f64> {
        self.trips.first().map(|trip| trip.end_odometer)
    }

    pub fn update_settings(
        &mut self,
        fuel_price: f64,
        average_consumption: f64,
    ) -> Result<AppSettings, AppError> {
        let settings = AppSettings::new(fuel_price, average_consumption)?;
        self.settings = settings;
        Ok(settings)
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats::compute(&self.trips)
    }
}
