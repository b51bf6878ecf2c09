//! Startup orchestration.
//!
//! Order matters: host types are published before any module loads,
//! modules register before connectors resolve, and connectors attach to the
//! dispatcher last.

use crate::config::{Config, LoaderKind};
use crate::error::ServerError;
use grid_capabilities::CapabilityContainer;
use grid_connectors::{initialize, AssetServiceConnector, RequestDispatcher};
use grid_modules::{
    HostScope, LibraryContextFactory, LoadContextFactory, LoadOptions, ModuleLoader, ModuleRecord,
    StaticContextFactory, StaticModuleTable,
};
use grid_services::{shared_types, AssetBase, AssetMetadata, AssetService};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Modules linked into the server binary.
pub fn static_modules() -> StaticModuleTable {
    StaticModuleTable::new().with_module(module_asset_memory::DECLARATION)
}

/// Framework types and service contracts every module shares with the host.
pub fn host_scope() -> Result<HostScope, ServerError> {
    let host = HostScope::new();
    host.provide::<AssetBase>(shared_types::ASSET_BASE)?;
    host.provide::<AssetMetadata>(shared_types::ASSET_METADATA)?;
    host.provide_contract::<dyn AssetService>()?;
    Ok(host)
}

/// A running grid server.
pub struct GridServer {
    config: Config,
    dispatcher: Arc<RequestDispatcher>,
    container: Arc<CapabilityContainer>,
    host: Arc<HostScope>,
    loader: ModuleLoader,
    connectors: Vec<String>,
    // Declared last so it drops last: instances held above may run module code.
    modules: Vec<ModuleRecord>,
}

impl GridServer {
    /// Loads modules and brings up the configured connectors.
    ///
    /// Module load failures are logged and recorded, never fatal. Connector
    /// failures abort startup when `fail_fast` is set and are skipped with a
    /// warning otherwise.
    pub async fn start(config: Config) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;
        info!("🚀 Starting grid server ({:?} module loader)", config.modules.loader);

        let host = Arc::new(host_scope()?);
        let container = Arc::new(CapabilityContainer::new());
        let factory: Arc<dyn LoadContextFactory> = match config.modules.loader {
            LoaderKind::Library => Arc::new(LibraryContextFactory::new(host.clone())),
            LoaderKind::Static => Arc::new(StaticContextFactory::new(host.clone(), static_modules())),
        };

        let mut server = Self {
            loader: ModuleLoader::new(factory, container.clone()),
            dispatcher: Arc::new(RequestDispatcher::new()),
            container,
            host,
            connectors: Vec::new(),
            modules: Vec::new(),
            config,
        };

        if server.config.modules.auto_load {
            server.load_modules().await?;
        } else {
            info!("Module auto-load disabled");
        }
        server.start_connectors()?;

        info!(
            "✅ Grid server started: {} modules, {} bindings, connectors [{}]",
            server.loaded_modules().count(),
            server.container.len(),
            server.connectors.join(", ")
        );
        Ok(server)
    }

    /// Loads the configured modules. Returns how many loaded.
    ///
    /// The library loader loads what it finds in the module directory. The
    /// static loader loads every linked module, file or not.
    pub async fn load_modules(&mut self) -> Result<usize, ServerError> {
        let settings = &self.config.modules;
        let options = LoadOptions {
            whitelist: settings.whitelist.clone(),
            timeout: settings.load_timeout(),
        };
        let records = match settings.loader {
            LoaderKind::Library => self.loader.load_directory(&settings.directory, &options).await?,
            LoaderKind::Static => {
                let paths = static_modules().module_paths(&settings.directory);
                self.loader.load_paths(paths, &options).await
            }
        };
        let loaded = records.iter().filter(|record| record.is_loaded()).count();
        self.modules.extend(records);
        Ok(loaded)
    }

    /// Loads one more module on demand.
    pub async fn load_module(&mut self, path: impl AsRef<Path>) -> &ModuleRecord {
        let record = self
            .loader
            .load_module_within(path.as_ref(), self.config.modules.load_timeout())
            .await;
        self.modules.push(record);
        &self.modules[self.modules.len() - 1]
    }

    fn start_connectors(&mut self) -> Result<(), ServerError> {
        for service in self.config.server.services.clone() {
            match self.start_connector(&service) {
                Ok(()) => self.connectors.push(service),
                Err(e) if self.config.server.fail_fast => return Err(e),
                Err(e) => warn!("Skipping connector: {}", e),
            }
        }
        Ok(())
    }

    fn start_connector(&self, service: &str) -> Result<(), ServerError> {
        let sections = &self.config.connectors;
        let result = match service {
            "AssetService" => {
                initialize::<AssetServiceConnector>(service, sections, &self.container, &self.dispatcher).map(drop)
            }
            other => return Err(ServerError::UnknownService(other.to_string())),
        };
        result.map_err(|source| ServerError::Connector {
            service: service.to_string(),
            source,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn container(&self) -> &Arc<CapabilityContainer> {
        &self.container
    }

    pub fn dispatcher(&self) -> &Arc<RequestDispatcher> {
        &self.dispatcher
    }

    pub fn host(&self) -> &Arc<HostScope> {
        &self.host
    }

    /// Every load attempt so far, failures included.
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    pub fn loaded_modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter().filter(|record| record.is_loaded())
    }

    /// Names of the connectors that came up.
    pub fn connectors(&self) -> &[String] {
        &self.connectors
    }

    /// Unloads every module context and stops the server.
    pub fn shutdown(mut self) {
        info!("🛑 Shutting down grid server");
        self.modules.extend(self.loader.take_late_records());

        let (mut released, mut still_referenced) = (0, 0);
        for report in self.modules.iter().filter_map(|record| record.unload()) {
            released += report.released;
            still_referenced += report.still_referenced;
        }
        info!(
            "Unloaded {} module contexts ({} modules released, {} still referenced)",
            self.modules.len(),
            released,
            still_referenced
        );
    }
}
