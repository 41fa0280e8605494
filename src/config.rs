use std::{env, net::SocketAddr, path::PathBuf};

use url::Url;

use crate::error::AppError;

const DEFAULT_INSIGHT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_INSIGHT_MODEL: &str = "gemini-3-flash-preview";

/// Where the three persisted entries live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// One JSON file per key inside the directory.
    Directory(PathBuf),
    /// `kv_entries` table in a SQLite database.
    Sqlite(String),
    /// Process-local map, lost on exit.
    Memory,
}

impl StorageBackend {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::Config("STORAGE_URL must not be empty".into()));
        }
        if raw == "memory:" {
            Ok(Self::Memory)
        } else if raw.starts_with("sqlite:") {
            Ok(Self::Sqlite(raw.to_string()))
        } else {
            Ok(Self::Directory(PathBuf::from(raw)))
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub storage: StorageBackend,
    pub insight_api_key: Option<String>,
    pub insight_model: String,
    pub insight_endpoint: Url,
    pub recent_trips: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let storage =
            StorageBackend::parse(&env::var("STORAGE_URL").unwrap_or_else(|_| "data".to_string()))?;

        let insight_api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let insight_model =
            env::var("INSIGHT_MODEL").unwrap_or_else(|_| DEFAULT_INSIGHT_MODEL.to_string());

        let insight_endpoint = parse_endpoint(
            &env::var("INSIGHT_ENDPOINT").unwrap_or_else(|_| DEFAULT_INSIGHT_ENDPOINT.to_string()),
        )?;

        let recent_trips = match env::var("DASHBOARD_RECENT_TRIPS") {
            Ok(raw) => raw.trim().parse().map_err(|err| {
                AppError::Config(format!("invalid DASHBOARD_RECENT_TRIPS: {err}"))
            })?,
            Err(_) => 3,
        };

        Ok(Self {
            listen_addr,
            storage,
            insight_api_key,
            insight_model,
            insight_endpoint,
            recent_trips,
        })
    }

    /// Defaults with an in-memory store and no insight credentials.
    pub fn ephemeral() -> Result<Self, AppError> {
        Ok(Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            storage: StorageBackend::Memory,
            insight_api_key: None,
            insight_model: DEFAULT_INSIGHT_MODEL.to_string(),
            insight_endpoint: parse_endpoint(DEFAULT_INSIGHT_ENDPOINT)?,
            recent_trips: 3,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, AppError> {
    let mut url =
        Url::parse(raw).map_err(|err| AppError::Config(format!("invalid INSIGHT_ENDPOINT: {err}")))?;
    // `Url::join` drops the last segment unless the base ends with a slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parsing() {
        assert_eq!(StorageBackend::parse("memory:").unwrap(), StorageBackend::Memory);
        assert_eq!(
            StorageBackend::parse("sqlite://logbook.db").unwrap(),
            StorageBackend::Sqlite("sqlite://logbook.db".into())
        );
        assert_eq!(
            StorageBackend::parse(" data ").unwrap(),
            StorageBackend::Directory(PathBuf::from("data"))
        );
        assert!(StorageBackend::parse("   ").is_err());
    }

    #[test]
    fn endpoint_gets_trailing_slash() {
        let url = parse_endpoint("https://example.test/v1beta").unwrap();
        assert_eq!(url.as_str(), "https://example.test/v1beta/");
    }
}
