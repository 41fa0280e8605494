use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("end odometer ({end} km) must be greater than start odometer ({start} km)")]
    Ordering { start: f64, end: f64 },
    #[error("no trip is in progress")]
    NoActiveTrip,
    #[error("a trip is already in progress")]
    TripInProgress,
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("insight service is not configured")]
    InsightUnavailable,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Errors caused by user input; the triggering operation changed nothing.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::Ordering { .. }
                | AppError::NoActiveTrip
                | AppError::TripInProgress
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_)
            | AppError::Ordering { .. }
            | AppError::NoActiveTrip
            | AppError::TripInProgress => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Json(_)
            | AppError::Http(_)
            | AppError::InsightUnavailable
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
