//! # Core Configuration
//!
//! `CoreConfig` carries everything the library core needs at bootstrap: where
//! the database lives, how large result pages are, how many filter presets to
//! keep, the host's settings store and the logging setup.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .page_size(100)
//!     .settings_store(Arc::new(MySettingsStore))
//!     .build()?;
//! ```
//!
//! `build()` fails fast: a missing database path is a `Config` error, a
//! missing settings store is `CapabilityMissing`, and out-of-range numbers are
//! rejected by [`CoreConfig::validate`].

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::SettingsStore;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PRESET_CAPACITY: usize = 50;

const MAX_PAGE_SIZE: u32 = 500;
const MAX_PRESET_CAPACITY: usize = 500;

/// Validated bootstrap configuration.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Upper bound on pooled database connections
    pub max_connections: u32,

    /// Rows per page for paged queries and streams
    pub page_size: u32,

    /// Number of saved filter presets retained (newest first)
    pub preset_capacity: usize,

    /// User preferences storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Subscriber setup installed when the core service bootstraps
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("max_connections", &self.max_connections)
            .field("page_size", &self.page_size)
            .field("preset_capacity", &self.preset_capacity)
            .field("settings_store", &"SettingsStore { ... }")
            .field("logging", &self.logging)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks value ranges.
    ///
    /// - database path is not empty
    /// - `max_connections` is at least 1
    /// - `page_size` is within 1..=500
    /// - `preset_capacity` is within 1..=500
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.preset_capacity == 0 || self.preset_capacity > MAX_PRESET_CAPACITY {
            return Err(Error::Config(format!(
                "preset_capacity must be between 1 and {}, got {}",
                MAX_PRESET_CAPACITY, self.preset_capacity
            )));
        }

        Ok(())
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required to persist filter presets. \
                 Desktop: inject a file-backed store. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore). \
                 Tests: use bridge_traits::InMemorySettingsStore."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    max_connections: Option<u32>,
    page_size: Option<u32>,
    preset_capacity: Option<usize>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the database file path (required).
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Pool size; defaults to 5.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Page size for paged queries; defaults to 50.
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Saved preset limit; defaults to 50.
    pub fn preset_capacity(mut self, capacity: usize) -> Self {
        self.preset_capacity = Some(capacity);
        self
    }

    /// Sets the settings store (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let settings_store = self.settings_store.ok_or_else(settings_store_missing_error)?;

        let config = CoreConfig {
            database_path,
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            preset_capacity: self.preset_capacity.unwrap_or(DEFAULT_PRESET_CAPACITY),
            settings_store,
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::BridgeError;
    use mockall::mock;

    mock! {
        Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> std::result::Result<(), BridgeError>;
            async fn get_string(&self, key: &str) -> std::result::Result<Option<String>, BridgeError>;
            async fn delete(&self, key: &str) -> std::result::Result<(), BridgeError>;
            async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError>;
        }
    }

    fn store() -> Arc<dyn SettingsStore> {
        Arc::new(MockSettings::new())
    }

    #[test]
    fn test_builder_applies_defaults() {
        let config = CoreConfig::builder()
            .database_path("/data/library.db")
            .settings_store(store())
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/library.db"));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.preset_capacity, DEFAULT_PRESET_CAPACITY);
        assert!(config.logging.logger_sink.is_none());
    }

    #[test]
    fn test_builder_requires_database_path() {
        let err = CoreConfig::builder()
            .settings_store(store())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("Database path is required"));
    }

    #[test]
    fn test_builder_requires_settings_store() {
        let err = CoreConfig::builder()
            .database_path("/data/library.db")
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, message } => {
                assert_eq!(capability, "SettingsStore");
                assert!(message.contains("filter presets"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_page_size_out_of_range() {
        for size in [0, 501] {
            let err = CoreConfig::builder()
                .database_path("/data/library.db")
                .page_size(size)
                .settings_store(store())
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("page_size"));
        }
    }

    #[test]
    fn test_validate_rejects_zero_preset_capacity() {
        let err = CoreConfig::builder()
            .database_path("/data/library.db")
            .preset_capacity(0)
            .settings_store(store())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("preset_capacity"));
    }

    #[test]
    fn test_validate_rejects_empty_path_and_zero_pool() {
        let err = CoreConfig::builder()
            .database_path("")
            .settings_store(store())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));

        let err = CoreConfig::builder()
            .database_path("/data/library.db")
            .max_connections(0)
            .settings_store(store())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn test_custom_values_survive_build() {
        let config = CoreConfig::builder()
            .database_path("/data/library.db")
            .max_connections(2)
            .page_size(500)
            .preset_capacity(10)
            .settings_store(store())
            .build()
            .unwrap();

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.page_size, 500);
        assert_eq!(config.preset_capacity, 10);
        assert!(format!("{config:?}").contains("SettingsStore { ... }"));
    }
}
