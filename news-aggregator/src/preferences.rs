use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::types::{Result, UserPreferences};

/// Key the preferences live under inside the JSON document.
pub const PREFERENCES_KEY: &str = "newsPreferences";

/// Load/save for [`UserPreferences`]. The aggregation code never touches
/// storage itself; the application loads a value and passes it in.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self) -> Result<UserPreferences>;
    async fn save(&self, preferences: &UserPreferences) -> Result<()>;
}

/// Preferences stored in a JSON key-value document on disk.
///
/// A missing or unreadable document loads as empty preferences. Saving keeps
/// any other keys already in the document.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Option<Map<String, Value>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                warn!("Preferences file {} is not a JSON object, ignoring it", self.path.display());
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self) -> Result<UserPreferences> {
        let Some(document) = self.read_document().await? else {
            return Ok(UserPreferences::default());
        };
        let Some(value) = document.get(PREFERENCES_KEY) else {
            return Ok(UserPreferences::default());
        };
        match serde_json::from_value(value.clone()) {
            Ok(preferences) => Ok(preferences),
            Err(e) => {
                warn!("Failed to parse saved preferences: {}", e);
                Ok(UserPreferences::default())
            }
        }
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<()> {
        let mut document = self.read_document().await?.unwrap_or_default();
        document.insert(PREFERENCES_KEY.to_string(), serde_json::to_value(preferences)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(document))?;
        tokio::fs::write(&self.path, body).await?;

        info!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: RwLock<UserPreferences>,
}

impl MemoryPreferenceStore {
    pub fn new(preferences: UserPreferences) -> Self {
        Self {
            inner: RwLock::new(preferences),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<UserPreferences> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<()> {
        *self.inner.write().await = preferences.clone();
        Ok(())
    }
}
