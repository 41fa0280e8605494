use serde::Serialize;

use super::trip::Trip;

/// Totals derived from the whole ledger. Never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_distance: f64,
    pub total_cost: f64,
    pub total_fuel: f64,
    pub average_trip_distance: f64,
}

impl HistoryStats {
    pub fn compute(trips: &[Trip]) -> Self {
        let (total_distance, total_cost, total_fuel) =
            trips.iter().fold((0.0, 0.0, 0.0), |(distance, cost, fuel), trip| {
                (
                    distance + trip.distance_km,
                    cost + trip.total_cost,
                    fuel + trip.fuel_consumed,
                )
            });
        let average_trip_distance = if trips.is_empty() {
            0.0
        } else {
            total_distance / trips.len() as f64
        };
        Self {
            total_distance,
            total_cost,
            total_fuel,
            average_trip_distance,
        }
    }
}
