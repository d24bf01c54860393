//! Key-value settings storage.
//!
//! Hosts back this with their preferences facility (UserDefaults,
//! SharedPreferences, a JSON file on desktop). The library keeps its saved
//! filter presets under a single versioned key as a JSON document.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{BridgeError, Result};

/// Settings storage trait for user preferences
///
/// # Example
///
/// ```ignore
/// use bridge_traits::settings::SettingsStore;
///
/// async fn remember_sort(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("library.sort", "TitleAsc").await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Process-local settings store.
///
/// Nothing is persisted; useful for tests and for hosts that have not wired a
/// preferences backend yet.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> BridgeError {
    BridgeError::OperationFailed("settings lock poisoned".to_string())
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .values
            .read()
            .map_err(|_| poisoned())?
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip_and_delete() {
        let store = InMemorySettingsStore::new();
        assert!(!store.has_key("a").await.unwrap());

        store.set_string("a", "1").await.unwrap();
        store.set_string("b", "2").await.unwrap();
        assert_eq!(store.get_string("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.list_keys().await.unwrap(), vec!["a", "b"]);

        store.delete("a").await.unwrap();
        assert!(!store.has_key("a").await.unwrap());
        assert_eq!(store.list_keys().await.unwrap(), vec!["b"]);
    }
}
