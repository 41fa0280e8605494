use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    config::StorageBackend,
    db::{init_pool, SqliteStore},
    error::AppError,
    models::{
        settings::AppSettings,
        trip::{ActiveTrip, Trip},
    },
};

pub const TRIPS_KEY: &str = "logbook_trips_v1";
pub const SETTINGS_KEY: &str = "logbook_settings_v1";
pub const ACTIVE_TRIP_KEY: &str = "logbook_active_trip_v1";

/// String keys mapped to JSON documents. No transactions, no schema versions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

pub async fn open_store(backend: &StorageBackend) -> Result<Arc<dyn KeyValueStore>, AppError> {
    match backend {
        StorageBackend::Directory(root) => {
            let store = JsonDirStore::new(root.clone());
            store.ensure_structure().await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Sqlite(url) => {
            let pool = init_pool(url).await?;
            SqliteStore::migrate(&pool).await?;
            Ok(Arc::new(SqliteStore::new(pool)))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::default())),
    }
}

/// Keeps every key in `<root>/<key>.json`.
#[derive(Clone)]
pub struct JsonDirStore {
    root: Arc<PathBuf>,
}

impl JsonDirStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root().join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for JsonDirStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.ensure_structure().await?;
        fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        if fs::try_exists(&path).await? {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the guard cannot leave the map half-written.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Typed access to the three persisted entries.
///
/// Loading never fails: unreadable or malformed content is logged and
/// replaced by the empty or default value.
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn KeyValueStore>,
}

impl StorageService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn load_trips(&self) -> Vec<Trip> {
        self.load(TRIPS_KEY).await.unwrap_or_default()
    }

    pub async fn load_settings(&self) -> AppSettings {
        match self.load::<AppSettings>(SETTINGS_KEY).await {
            Some(settings) if settings.is_valid() => settings,
            Some(settings) => {
                warn!(?settings, "stored settings out of range, using defaults");
                AppSettings::default()
            }
            None => AppSettings::default(),
        }
    }

    pub async fn load_active_trip(&self) -> Option<ActiveTrip> {
        self.load(ACTIVE_TRIP_KEY).await
    }

    pub async fn save_trips(&self, trips: &[Trip]) -> Result<(), AppError> {
        self.save(TRIPS_KEY, trips).await
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), AppError> {
        self.save(SETTINGS_KEY, settings).await
    }

    /// `None` deletes the entry instead of storing a null.
    pub async fn save_active_trip(&self, active: Option<&ActiveTrip>) -> Result<(), AppError> {
        match active {
            Some(active) => self.save(ACTIVE_TRIP_KEY, active).await,
            None => self.store.remove(ACTIVE_TRIP_KEY).await,
        }
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "nothing stored yet");
                return None;
            }
            Err(err) => {
                warn!(key, "reading stored value failed: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, "stored value is malformed, falling back: {err}");
                None
            }
        }
    }

    async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let data = serde_json::to_string(value)?;
        self.store.set(key, &data).await
    }
}
