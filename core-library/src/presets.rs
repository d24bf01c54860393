//! Saved filter presets.
//!
//! Presets live in the host's [`SettingsStore`] as one JSON array under
//! [`PRESETS_KEY`], oldest first. Only the newest `capacity` presets are
//! kept. A stored document that no longer parses is logged and read as an
//! empty list; the next save replaces it.

use crate::error::{LibraryError, Result};
use crate::filter::FilterSpec;
use bridge_traits::settings::SettingsStore;
use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use futures::lock::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Settings key holding the preset list.
pub const PRESETS_KEY: &str = "library.filter_presets.v1";

/// Presets kept when no capacity is configured.
pub const DEFAULT_PRESET_CAPACITY: usize = 50;

/// A named, saved [`FilterSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub id: String,
    pub name: String,
    pub spec: FilterSpec,
    pub created_at: DateTime<Utc>,
}

pub struct FilterPresetStore {
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    capacity: usize,
    // Serializes read-modify-write cycles on the stored list.
    write_lock: Mutex<()>,
}

impl FilterPresetStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            settings,
            clock: Arc::new(SystemClock),
            capacity: DEFAULT_PRESET_CAPACITY,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored presets, oldest first.
    pub async fn presets(&self) -> Result<Vec<FilterPreset>> {
        let Some(raw) = self.settings.get_string(PRESETS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(presets) => Ok(presets),
            Err(e) => {
                warn!(error = %e, key = PRESETS_KEY, "Discarding unreadable filter presets");
                Ok(Vec::new())
            }
        }
    }

    pub async fn find_preset(&self, id: &str) -> Result<Option<FilterPreset>> {
        Ok(self.presets().await?.into_iter().find(|p| p.id == id))
    }

    /// Save `spec` under `name` and return the new preset.
    ///
    /// The name is trimmed and must not be blank. Names need not be unique;
    /// each save gets a fresh id.
    pub async fn save_preset(&self, name: &str, spec: &FilterSpec) -> Result<FilterPreset> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "name".to_string(),
                message: "preset name must not be blank".to_string(),
            });
        }

        let preset = FilterPreset {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            spec: spec.clone(),
            created_at: self.clock.now(),
        };

        let _guard = self.write_lock.lock().await;
        let mut presets = self.presets().await?;
        presets.push(preset.clone());
        let overflow = presets.len().saturating_sub(self.capacity);
        if overflow > 0 {
            presets.drain(..overflow);
            debug!(dropped = overflow, "Dropped oldest filter presets");
        }
        self.store(&presets).await?;

        info!(preset_id = %preset.id, total = presets.len(), "Saved filter preset");
        Ok(preset)
    }

    /// Remove the preset with `id`. Returns whether one was removed.
    pub async fn delete_preset(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut presets = self.presets().await?;
        let before = presets.len();
        presets.retain(|p| p.id != id);
        if presets.len() == before {
            return Ok(false);
        }

        self.store(&presets).await?;
        info!(preset_id = %id, "Deleted filter preset");
        Ok(true)
    }

    async fn store(&self, presets: &[FilterPreset]) -> Result<()> {
        let json = serde_json::to_string(presets)?;
        self.settings.set_string(PRESETS_KEY, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortOrder;
    use crate::models::TagId;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::settings::InMemorySettingsStore;
    use chrono::TimeZone;
    use mockall::mock;
    use std::sync::atomic::{AtomicI64, Ordering};

    mock! {
        Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()>;
            async fn get_string(&self, key: &str) -> BridgeResult<Option<String>>;
            async fn delete(&self, key: &str) -> BridgeResult<()>;
            async fn list_keys(&self) -> BridgeResult<Vec<String>>;
        }
    }

    /// Advances one second per reading.
    struct StepClock(AtomicI64);

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.0.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
        }
    }

    fn store() -> (Arc<InMemorySettingsStore>, FilterPresetStore) {
        let settings = Arc::new(InMemorySettingsStore::new());
        let presets = FilterPresetStore::new(settings.clone())
            .with_clock(Arc::new(StepClock(AtomicI64::new(0))));
        (settings, presets)
    }

    #[tokio::test]
    async fn save_trims_name_and_round_trips_spec() {
        let (_, store) = store();
        let spec = FilterSpec::new()
            .with_text_query("rain")
            .toggle_include_tag(TagId(4))
            .with_sort(SortOrder::RjAsc);

        let saved = store.save_preset("  Night rain ", &spec).await.unwrap();
        assert_eq!(saved.name, "Night rain");
        assert_eq!(saved.spec, spec);

        let listed = store.presets().await.unwrap();
        assert_eq!(listed, vec![saved.clone()]);
        assert_eq!(store.find_preset(&saved.id).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (settings, store) = store();
        let err = store.save_preset("   ", &FilterSpec::new()).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
        assert!(!settings.has_key(PRESETS_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn oldest_presets_are_dropped_beyond_capacity() {
        let (_, store) = store();
        let store = store.with_capacity(3);
        for name in ["a", "b", "c", "d", "e"] {
            store.save_preset(name, &FilterSpec::new()).await.unwrap();
        }

        let names: Vec<String> = store
            .presets()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["c", "d", "e"]);
    }

    #[tokio::test]
    async fn each_save_gets_a_new_id() {
        let (_, store) = store();
        let first = store.save_preset("same", &FilterSpec::new()).await.unwrap();
        let second = store.save_preset("same", &FilterSpec::new()).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(first.created_at < second.created_at);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let (_, store) = store();
        let kept = store.save_preset("keep", &FilterSpec::new()).await.unwrap();
        let gone = store.save_preset("drop", &FilterSpec::new()).await.unwrap();

        assert!(store.delete_preset(&gone.id).await.unwrap());
        assert!(!store.delete_preset(&gone.id).await.unwrap());
        assert_eq!(store.presets().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn unreadable_document_reads_as_empty_and_is_replaced() {
        let (settings, store) = store();
        settings.set_string(PRESETS_KEY, "{not json").await.unwrap();

        assert!(store.presets().await.unwrap().is_empty());

        store.save_preset("fresh", &FilterSpec::new()).await.unwrap();
        assert_eq!(store.presets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settings_failures_propagate() {
        let mut settings = MockSettings::new();
        settings.expect_get_string().returning(|_| Ok(None));
        settings
            .expect_set_string()
            .returning(|_, _| Err(BridgeError::OperationFailed("read-only volume".into())));

        let store = FilterPresetStore::new(Arc::new(settings));
        let err = store
            .save_preset("x", &FilterSpec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Bridge(_)));
    }

    #[tokio::test]
    async fn capacity_is_at_least_one() {
        let (_, store) = store();
        assert_eq!(store.with_capacity(0).capacity(), 1);
    }
}
