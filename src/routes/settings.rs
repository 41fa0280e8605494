use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;

use super::parse_number;
use crate::{error::AppError, models::settings::AppSettings, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(settings_form).post(settings_submit))
}

#[derive(Template)]
#[template(path = "settings.html")]
struct SettingsTemplate {
    fuel_price: String,
    average_consumption: String,
    saved: bool,
    show_error: bool,
    error_message: String,
}

#[derive(Deserialize, Default)]
struct SettingsQuery {
    saved: Option<String>,
}

async fn settings_form(
    State(state): State<AppState>,
    Query(query): Query<SettingsQuery>,
) -> impl IntoResponse {
    let settings = *state.logbook().await.settings();
    AskamaTemplateResponse::into_response(SettingsTemplate {
        fuel_price: settings.fuel_price.to_string(),
        average_consumption: settings.average_consumption.to_string(),
        saved: query.saved.is_some(),
        show_error: false,
        error_message: String::new(),
    })
}

#[derive(Deserialize)]
struct SettingsForm {
    fuel_price: String,
    average_consumption: String,
}

async fn settings_submit(
    State(state): State<AppState>,
    Form(form): Form<SettingsForm>,
) -> Result<Response, AppError> {
    let result = apply(&state, &form).await;
    match result {
        Ok(_) => Ok(Redirect::to("/settings?saved=1").into_response()),
        Err(err) if err.is_user_error() => Ok((
            StatusCode::BAD_REQUEST,
            AskamaTemplateResponse::into_response(SettingsTemplate {
                fuel_price: form.fuel_price,
                average_consumption: form.average_consumption,
                saved: false,
                show_error: true,
                error_message: err.to_string(),
            }),
        )
            .into_response()),
        Err(err) => Err(err),
    }
}

async fn apply(state: &AppState, form: &SettingsForm) -> Result<AppSettings, AppError> {
    let fuel_price = parse_number(&form.fuel_price, "fuel price")?;
    let average_consumption = parse_number(&form.average_consumption, "average consumption")?;
    state.update_settings(fuel_price, average_consumption).await
}
