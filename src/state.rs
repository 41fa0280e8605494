use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    config::AppConfig,
    error::AppError,
    logbook::Logbook,
    models::{
        settings::AppSettings,
        trip::{ActiveTrip, Trip},
    },
    services::{
        insight::{InsightService, INSIGHT_TRIP_LIMIT, UNAVAILABLE_MESSAGE},
        storage::StorageService,
    },
};

/// Latest insight text shown on the dashboard.
#[derive(Debug, Clone, Default)]
pub struct InsightPanel {
    pub text: Option<String>,
    pub pending: bool,
}

/// Shared handle for the request handlers.
///
/// Every mutation runs under the logbook lock and writes the affected entries
/// through to storage before the lock is released, so writes follow mutation order.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: StorageService,
    pub insight: InsightService,
    logbook: Arc<Mutex<Logbook>>,
    panel: Arc<Mutex<InsightPanel>>,
}

impl AppState {
    pub async fn load(config: AppConfig, storage: StorageService, insight: InsightService) -> Self {
        let settings = storage.load_settings().await;
        let trips = storage.load_trips().await;
        let active_trip = storage.load_active_trip().await;
        info!(
            trips = trips.len(),
            active = active_trip.is_some(),
            "logbook loaded"
        );
        Self {
            config,
            storage,
            insight,
            logbook: Arc::new(Mutex::new(Logbook::new(settings, trips, active_trip))),
            panel: Arc::new(Mutex::new(InsightPanel::default())),
        }
    }

    /// Copy of the current logbook for rendering.
    pub async fn logbook(&self) -> Logbook {
        self.logbook.lock().await.clone()
    }

    pub async fn start_trip(&self, start_odometer: f64, note: Option<&str>) -> Result<ActiveTrip, AppError> {
        let mut logbook = self.logbook.lock().await;
        let active = logbook.start_trip(start_odometer, note)?;
        info!(start_odometer, "trip started");
        written(
            "active trip",
            self.storage.save_active_trip(Some(&active)).await,
        );
        Ok(active)
    }

    pub async fn end_trip(&self, end_odometer: f64, note: Option<&str>) -> Result<Trip, AppError> {
        let mut logbook = self.logbook.lock().await;
        let trip = logbook.end_trip(end_odometer, note)?;
        info!(id = %trip.id, distance_km = trip.distance_km, total_cost = trip.total_cost, "trip finished");
        written("trips", self.storage.save_trips(logbook.trips()).await);
        written("active trip", self.storage.save_active_trip(None).await);
        Ok(trip)
    }

    pub async fn delete_trip(&self, id: &str) -> bool {
        let mut logbook = self.logbook.lock().await;
        let removed = logbook.delete_trip(id);
        if removed {
            info!(id, "trip deleted");
        } else {
            debug!(id, "no trip to delete");
        }
        written("trips", self.storage.save_trips(logbook.trips()).await);
        removed
    }

    pub async fn update_settings(
        &self,
        fuel_price: f64,
        average_consumption: f64,
    ) -> Result<AppSettings, AppError> {
        let mut logbook = self.logbook.lock().await;
        let settings = logbook.update_settings(fuel_price, average_consumption)?;
        info!(fuel_price, average_consumption, "settings updated");
        written("settings", self.storage.save_settings(&settings).await);
        Ok(settings)
    }

    pub async fn insight_panel(&self) -> InsightPanel {
        self.panel.lock().await.clone()
    }

    /// Asks the insight collaborator about the newest trips. A request made
    /// while another one is pending returns the current text unchanged.
    pub async fn request_insight(&self) -> Option<String> {
        {
            let mut panel = self.panel.lock().await;
            if panel.pending {
                return panel.text.clone();
            }
            panel.pending = true;
        }

        let (trips, settings) = {
            let logbook = self.logbook.lock().await;
            (
                logbook.recent_trips(INSIGHT_TRIP_LIMIT).to_vec(),
                *logbook.settings(),
            )
        };
        // Detached so a dropped request still clears the pending flag.
        let insight = self.insight.clone();
        let panel = self.panel.clone();
        let task = tokio::spawn(async move {
            let text = insight.summarize(&trips, &settings).await;
            let mut panel = panel.lock().await;
            panel.pending = false;
            panel.text = Some(text.clone());
            text
        });

        match task.await {
            Ok(text) => Some(text),
            Err(err) => {
                error!("insight task failed: {err}");
                let mut panel = self.panel.lock().await;
                panel.pending = false;
                panel.text = Some(UNAVAILABLE_MESSAGE.to_string());
                panel.text.clone()
            }
        }
    }
}

/// Write-through is fire-and-forget: a failed write is logged and the
/// in-memory state stays as mutated.
fn written(what: &str, result: Result<(), AppError>) {
    if let Err(err) = result {
        error!("persisting {what} failed: {err}");
    }
}
