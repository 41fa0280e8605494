use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::TripRow;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(history))
        .route("/history/:id/delete", post(delete_submit))
}

#[derive(Template)]
#[template(path = "history.html")]
struct HistoryTemplate {
    trips: Vec<TripRow>,
    confirm_id: String,
}

#[derive(Deserialize, Default)]
struct HistoryQuery {
    /// Row awaiting the second click of a delete.
    confirm: Option<String>,
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let logbook = state.logbook().await;
    AskamaTemplateResponse::into_response(HistoryTemplate {
        trips: logbook.trips().iter().map(TripRow::from).collect(),
        confirm_id: query.confirm.unwrap_or_default(),
    })
}

async fn delete_submit(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    state.delete_trip(&id).await;
    Redirect::to("/history")
}
