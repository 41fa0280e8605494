use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};

use super::{format_date, TripRow};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/insight", post(insight_submit))
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    total_distance: String,
    total_cost: String,
    total_fuel: String,
    average_distance: String,
    has_active: bool,
    active_since: String,
    active_odometer: String,
    trips: Vec<TripRow>,
    has_insight: bool,
    insight: String,
    insight_pending: bool,
}

async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let logbook = state.logbook().await;
    let panel = state.insight_panel().await;
    let stats = logbook.stats();
    let (has_active, active_since, active_odometer) = match logbook.active_trip() {
        Some(active) => (
            true,
            format!(
                "{} {}",
                format_date(active.start_date),
                active.start_time.format("%H:%M")
            ),
            active.start_odometer.to_string(),
        ),
        None => (false, String::new(), String::new()),
    };

    AskamaTemplateResponse::into_response(DashboardTemplate {
        total_distance: format!("{:.2}", stats.total_distance),
        total_cost: format!("{:.2}", stats.total_cost),
        total_fuel: format!("{:.1}", stats.total_fuel),
        average_distance: format!("{:.1}", stats.average_trip_distance),
        has_active,
        active_since,
        active_odometer,
        trips: logbook
            .recent_trips(state.config.recent_trips)
            .iter()
            .map(TripRow::from)
            .collect(),
        has_insight: panel.text.is_some(),
        insight: panel.text.unwrap_or_default(),
        insight_pending: panel.pending,
    })
}

async fn insight_submit(State(state): State<AppState>) -> Redirect {
    state.request_insight().await;
    Redirect::to("/")
}
