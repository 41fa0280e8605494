use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use super::{format_date, normalize_optional, parse_number};
use crate::{error::AppError, logbook::Logbook, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trip", get(trip_form))
        .route("/trip/start", post(start_submit))
        .route("/trip/end", post(end_submit))
}

/// Start form when no trip is running, finish form otherwise.
#[derive(Template)]
#[template(path = "trip_form.html")]
struct TripFormTemplate {
    has_active: bool,
    active_date: String,
    active_time: String,
    active_odometer: String,
    active_note: String,
    odometer: String,
    note: String,
    show_error: bool,
    error_message: String,
}

impl TripFormTemplate {
    fn for_logbook(logbook: &Logbook) -> Self {
        let mut template = Self {
            has_active: false,
            active_date: String::new(),
            active_time: String::new(),
            active_odometer: String::new(),
            active_note: String::new(),
            odometer: String::new(),
            note: String::new(),
            show_error: false,
            error_message: String::new(),
        };
        match logbook.active_trip() {
            Some(active) => {
                template.has_active = true;
                template.active_date = format_date(active.start_date);
                template.active_time = active.start_time.format("%H:%M").to_string();
                template.active_odometer = active.start_odometer.to_string();
                template.active_note = active.note_display().to_string();
            }
            None => {
                // Odometers are continuous: the next trip usually starts where the last one ended.
                template.odometer = logbook
                    .last_end_odometer()
                    .map(|value| value.to_string())
                    .unwrap_or_default();
            }
        }
        template
    }
}

async fn trip_form(State(state): State<AppState>) -> impl IntoResponse {
    let logbook = state.logbook().await;
    AskamaTemplateResponse::into_response(TripFormTemplate::for_logbook(&logbook))
}

#[derive(Deserialize)]
struct StartTripForm {
    start_odometer: String,
    note: Option<String>,
}

async fn start_submit(
    State(state): State<AppState>,
    Form(form): Form<StartTripForm>,
) -> Result<Response, AppError> {
    let note = normalize_optional(form.note.clone());
    let result = match parse_number(&form.start_odometer, "start odometer") {
        Ok(odometer) => state.start_trip(odometer, note.as_deref()).await.map(|_| ()),
        Err(err) => Err(err),
    };
    finish(&state, result, form.start_odometer, form.note).await
}

#[derive(Deserialize)]
struct EndTripForm {
    end_odometer: String,
    note: Option<String>,
}

async fn end_submit(
    State(state): State<AppState>,
    Form(form): Form<EndTripForm>,
) -> Result<Response, AppError> {
    let note = normalize_optional(form.note.clone());
    let result = match parse_number(&form.end_odometer, "end odometer") {
        Ok(odometer) => state.end_trip(odometer, note.as_deref()).await.map(|_| ()),
        Err(err) => Err(err),
    };
    finish(&state, result, form.end_odometer, form.note).await
}

/// Redirects home on success; user errors re-render the form with what was typed.
async fn finish(
    state: &AppState,
    result: Result<(), AppError>,
    odometer: String,
    note: Option<String>,
) -> Result<Response, AppError> {
    match result {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(err) if err.is_user_error() => {
            let logbook = state.logbook().await;
            let mut template = TripFormTemplate::for_logbook(&logbook);
            // The form shown now is the other one; its fields keep their defaults.
            if !matches!(err, AppError::TripInProgress | AppError::NoActiveTrip) {
                template.odometer = odometer;
                template.note = note.unwrap_or_default();
            }
            template.show_error = true;
            template.error_message = err.to_string();
            Ok((
                StatusCode::BAD_REQUEST,
                AskamaTemplateResponse::into_response(template),
            )
                .into_response())
        }
        Err(err) => Err(err),
    }
}
