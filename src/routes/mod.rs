pub mod dashboard;
pub mod history;
pub mod settings;
pub mod trips;

use axum::Router;
use chrono::NaiveDate;
use tower_http::services::ServeDir;

use crate::{error::AppError, models::trip::Trip, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(dashboard::router())
        .merge(trips::router())
        .merge(history::router())
        .merge(settings::router())
        .nest_service("/static", ServeDir::new("static"))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// One ledger row as the templates print it.
#[derive(Clone)]
struct TripRow {
    id: String,
    date: String,
    start_time: String,
    end_time: String,
    distance: String,
    start_odometer: String,
    end_odometer: String,
    cost: String,
    fuel: String,
    has_note: bool,
    note: String,
}

impl From<&Trip> for TripRow {
    fn from(trip: &Trip) -> Self {
        Self {
            id: trip.id.clone(),
            date: format_date(trip.date),
            start_time: trip.start_time.format("%H:%M").to_string(),
            end_time: trip.end_time.format("%H:%M").to_string(),
            distance: trip.distance_km.to_string(),
            start_odometer: trip.start_odometer.to_string(),
            end_odometer: trip.end_odometer.to_string(),
            cost: format!("{:.2}", trip.total_cost),
            fuel: format!("{:.2}", trip.fuel_consumed),
            has_note: trip.note.is_some(),
            note: trip.note_display().to_string(),
        }
    }
}

/// Reads a decimal typed by a person; `,` is accepted as the separator.
fn parse_number(raw: &str, field: &str) -> Result<f64, AppError> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AppError::Validation(format!("{field} must be a number")))
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_accepts_comma_and_rejects_garbage() {
        assert_eq!(parse_number(" 1,75 ", "fuel price").unwrap(), 1.75);
        assert_eq!(parse_number("1000", "odometer").unwrap(), 1000.0);
        let err = parse_number("abc", "odometer").unwrap_err();
        assert_eq!(err.to_string(), "odometer must be a number");
        assert!(parse_number("", "odometer").is_err());
        assert!(parse_number("inf", "odometer").is_err());
    }

    #[test]
    fn blank_optionals_become_none() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(normalize_optional(None), None);
    }
}
