use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{settings::AppSettings, trip::Trip},
};

/// How many of the newest trips go into a prompt.
pub const INSIGHT_TRIP_LIMIT: usize = 5;

pub const NO_TRIPS_MESSAGE: &str = "Log your first trip so there is something to analyse.";
pub const EMPTY_ANSWER_MESSAGE: &str = "Could not generate an analysis.";
pub const UNAVAILABLE_MESSAGE: &str = "Analysis is not available right now.";

/// Something that turns recent trips into a short written assessment.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn fetch_insight(&self, trips: &[Trip], settings: &AppSettings)
        -> Result<String, AppError>;
}

pub fn build_prompt(trips: &[Trip], settings: &AppSettings) -> String {
    let history: String = trips
        .iter()
        .take(INSIGHT_TRIP_LIMIT)
        .map(|trip| {
            format!(
                "Date: {}, Distance: {}km, Cost: {:.2}\n",
                trip.date, trip.distance_km, trip.total_cost
            )
        })
        .collect();
    format!(
        "Analyse this driving history (last {INSIGHT_TRIP_LIMIT} trips):\n\
         {history}\
         Current average consumption: {} L/100km.\n\
         Current fuel price: {} per liter.\n\
         In 2-3 sentences, tell me whether these costs are reasonable and give one tip for saving fuel.",
        settings.average_consumption, settings.fuel_price
    )
}

/// Google Gemini `generateContent` over plain HTTPS.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(endpoint: Url, model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self) -> Result<Url, AppError> {
        self.endpoint
            .join(&format!("models/{}:generateContent", self.model))
            .map_err(|err| AppError::Config(format!("invalid insight url: {err}")))
    }
}

#[async_trait]
impl InsightProvider for GeminiClient {
    #[instrument(skip_all)]
    async fn fetch_insight(
        &self,
        trips: &[Trip],
        settings: &AppSettings,
    ) -> Result<String, AppError> {
        info!(model = %self.model, trips = trips.len(), "requesting insight…");
        let response = self
            .client
            .post(self.url()?)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::new(build_prompt(trips, settings)))
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;
        Ok(response.into_text())
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn new(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().find_map(|part| part.text))
            .unwrap_or_default()
    }
}

/// Wraps an optional provider so callers always get a displayable string.
#[derive(Clone, Default)]
pub struct InsightService {
    provider: Option<Arc<dyn InsightProvider>>,
}

impl InsightService {
    pub fn new(provider: Option<Arc<dyn InsightProvider>>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let Some(api_key) = config.insight_api_key.as_deref() else {
            warn!("no insight api key configured, analysis disabled");
            return Ok(Self::default());
        };
        let client = GeminiClient::new(
            config.insight_endpoint.clone(),
            config.insight_model.clone(),
            api_key,
        )?;
        Ok(Self::new(Some(Arc::new(client))))
    }

    pub async fn summarize(&self, trips: &[Trip], settings: &AppSettings) -> String {
        if trips.is_empty() {
            return NO_TRIPS_MESSAGE.to_string();
        }
        let recent = &trips[..trips.len().min(INSIGHT_TRIP_LIMIT)];
        let result = match &self.provider {
            Some(provider) => provider.fetch_insight(recent, settings).await,
            None => Err(AppError::InsightUnavailable),
        };
        match result {
            Ok(text) if text.trim().is_empty() => EMPTY_ANSWER_MESSAGE.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                warn!("insight request failed: {err}");
                UNAVAILABLE_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn trip(id: usize) -> Trip {
        Trip {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, id as u32 + 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            start_odometer: 0.0,
            end_odometer: 12.5,
            distance_km: 12.5,
            fuel_price_at_time: 1.65,
            consumption_at_time: 6.5,
            fuel_consumed: 0.81,
            total_cost: 1.3,
            note: None,
        }
    }

    enum Reply {
        Text(&'static str),
        Fail,
    }

    struct Scripted {
        reply: Reply,
        seen: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl InsightProvider for Scripted {
        async fn fetch_insight(
            &self,
            trips: &[Trip],
            _settings: &AppSettings,
        ) -> Result<String, AppError> {
            self.seen.lock().unwrap().push(trips.len());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(AppError::InsightUnavailable),
            }
        }
    }

    #[tokio::test]
    async fn empty_ledger_skips_the_provider() {
        let provider = Scripted::new(Reply::Text("unused"));
        let service = InsightService::new(Some(provider.clone()));
        let text = service.summarize(&[], &AppSettings::default()).await;
        assert_eq!(text, NO_TRIPS_MESSAGE);
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_five_newest_trips_are_sent() {
        let provider = Scripted::new(Reply::Text(" Looks fine. "));
        let service = InsightService::new(Some(provider.clone()));
        let trips: Vec<Trip> = (0..8).map(trip).collect();
        let text = service.summarize(&trips, &AppSettings::default()).await;
        assert_eq!(text, "Looks fine.");
        assert_eq!(*provider.seen.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn failures_and_missing_config_fall_back() {
        let trips = vec![trip(0)];
        let settings = AppSettings::default();

        let failing = InsightService::new(Some(Scripted::new(Reply::Fail)));
        assert_eq!(failing.summarize(&trips, &settings).await, UNAVAILABLE_MESSAGE);

        let unconfigured = InsightService::default();
        assert_eq!(unconfigured.summarize(&trips, &settings).await, UNAVAILABLE_MESSAGE);

        let blank = InsightService::new(Some(Scripted::new(Reply::Text("  "))));
        assert_eq!(blank.summarize(&trips, &settings).await, EMPTY_ANSWER_MESSAGE);
    }

    #[test]
    fn prompt_lists_trips_and_rates() {
        let prompt = build_prompt(&[trip(0)], &AppSettings::default());
        assert!(prompt.contains("Date: 2024-02-01, Distance: 12.5km, Cost: 1.30"));
        assert!(prompt.contains("6.5 L/100km"));
        assert!(prompt.contains("1.65 per liter"));
        assert!(prompt.contains("trips):\nDate: 2024-02-01"));
        assert!(prompt.contains("Cost: 1.30\nCurrent average consumption"));
    }

    #[test]
    fn response_text_comes_from_first_candidate() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Cheap trips." }], "role": "model" } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(response.into_text(), "Cheap trips.");

        let empty: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty.into_text(), "");
    }

    #[test]
    fn url_targets_the_configured_model() {
        let client = GeminiClient::new(
            Url::parse("https://example.test/v1beta/").unwrap(),
            "some-model",
            "key",
        )
        .unwrap();
        assert_eq!(
            client.url().unwrap().as_str(),
            "https://example.test/v1beta/models/some-model:generateContent"
        );
    }
}
