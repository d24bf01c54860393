//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (database, settings)
//! into the library core. Desktop hosts usually call
//! [`CoreService::bootstrap`], which opens the native SQLite store at the
//! configured path and runs migrations. Hosts that bring their own relational
//! store build a [`CoreDependencies`] and use [`CoreService::new`].
//!
//! ```ignore
//! use core_runtime::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .settings_store(settings)
//!     .build()?;
//! let core = CoreService::bootstrap(config).await?;
//! let albums = core.library().query_albums(&spec, core.library().first_page()).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::database::{DatabaseAdapter, DatabaseConfig};
use bridge_traits::settings::SettingsStore;
use core_library::{FilterPresetStore, LibraryQueryService, SqliteAdapter};
use core_runtime::logging::init_logging;
use core_runtime::{CoreConfig, Error as RuntimeError};
use tracing::{info, warn};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub database: Arc<dyn DatabaseAdapter>,
    pub settings_store: Arc<dyn SettingsStore>,
}

impl CoreDependencies {
    pub fn new(database: Arc<dyn DatabaseAdapter>, settings_store: Arc<dyn SettingsStore>) -> Self {
        Self {
            database,
            settings_store,
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    library: LibraryQueryService,
    presets: Arc<FilterPresetStore>,
}

impl CoreService {
    /// Build the services over already-initialized dependencies.
    pub fn new(config: &CoreConfig, deps: CoreDependencies) -> Self {
        let library =
            LibraryQueryService::new(Arc::clone(&deps.database)).with_page_size(config.page_size);
        let presets = FilterPresetStore::new(Arc::clone(&deps.settings_store))
            .with_capacity(config.preset_capacity);

        Self {
            deps: Arc::new(deps),
            library,
            presets: Arc::new(presets),
        }
    }

    /// Install logging, then open and migrate the SQLite library at
    /// `config.database_path`.
    ///
    /// If the process already has a global subscriber, it is kept and a
    /// warning is logged. An invalid log filter fails the bootstrap.
    /// A `:memory:` path works for tests but needs `max_connections(1)`,
    /// since every in-memory connection is a separate database.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        install_logging(&config)?;

        let db_config = DatabaseConfig::new(&config.database_path)
            .with_max_connections(config.max_connections);
        let mut adapter = SqliteAdapter::new(db_config)
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
        adapter
            .initialize()
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        info!(
            page_size = config.page_size,
            preset_capacity = config.preset_capacity,
            "Library core ready"
        );

        let deps = CoreDependencies::new(Arc::new(adapter), Arc::clone(&config.settings_store));
        Ok(Self::new(&config, deps))
    }

    pub fn library(&self) -> &LibraryQueryService {
        &self.library
    }

    pub fn presets(&self) -> &FilterPresetStore {
        &self.presets
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }
}

fn install_logging(config: &CoreConfig) -> Result<()> {
    match init_logging(config.logging.clone()) {
        Ok(()) => Ok(()),
        Err(RuntimeError::Logging(reason)) => {
            warn!(%reason, "Keeping the existing tracing subscriber");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
