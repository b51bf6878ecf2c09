//! Module loader: one module, one context.
//!
//! The loader obtains a fresh context from its factory, loads the module,
//! lets the module register its implementations and logs the outcome. Load
//! failures never escape: they are logged and returned in the
//! [`ModuleRecord`], and the caller decides whether to retry, skip or abort.

use crate::context::{ContextId, LoadContext, LoadedModule, UnloadReport};
use crate::error::{DiscoveryError, LoadCause, LoadFailure};
use crate::factory::LoadContextFactory;
use futures::future::join_all;
use grid_capabilities::CapabilityContainer;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of one load attempt.
///
/// The record's module handle holds the module's lease; unloading the
/// record's context and dropping the record is what lets the module be
/// reclaimed.
pub struct ModuleRecord {
    pub path: PathBuf,
    /// Context the module was loaded into; `None` when the load never ran
    pub context: Option<Arc<dyn LoadContext>>,
    pub outcome: Result<LoadedModule, LoadFailure>,
    /// Module whose registration failed part way. Bindings it registered
    /// before failing stay in the container, so the module stays leased.
    residue: Option<LoadedModule>,
}

impl ModuleRecord {
    fn failed(path: PathBuf, context: Option<Arc<dyn LoadContext>>, cause: LoadCause) -> Self {
        let failure = LoadFailure::new(&path, cause);
        Self {
            path,
            context,
            outcome: Err(failure),
            residue: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn module(&self) -> Option<&LoadedModule> {
        self.outcome.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        self.outcome.as_ref().err()
    }

    pub fn context_id(&self) -> Option<ContextId> {
        self.context.as_ref().map(|context| context.id())
    }

    /// Unloads the record's context.
    pub fn unload(&self) -> Option<UnloadReport> {
        self.context.as_ref().map(|context| context.unload())
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("path", &self.path)
            .field("context", &self.context_id())
            .field("outcome", &self.outcome)
            .field("residue", &self.residue.as_ref().map(LoadedModule::name))
            .finish()
    }
}

/// Options for [`ModuleLoader::load_directory`] and
/// [`ModuleLoader::load_paths`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Module names to load; empty means every discovered module
    pub whitelist: Vec<String>,
    /// Per-module time limit
    pub timeout: Option<Duration>,
}

impl LoadOptions {
    fn admits(&self, path: &Path) -> bool {
        if self.whitelist.is_empty() {
            return true;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            return false;
        };
        let bare = stem.strip_prefix("lib").unwrap_or(stem);
        self.whitelist.iter().any(|name| name == stem || name == bare)
    }
}

/// Loads module files into isolated contexts.
///
/// Holds nothing but shared handles, so clones are cheap and loads may run
/// concurrently, each in its own context.
#[derive(Clone)]
pub struct ModuleLoader {
    factory: Arc<dyn LoadContextFactory>,
    container: Arc<CapabilityContainer>,
    /// Loads that finished after their caller stopped waiting
    late: Arc<Mutex<Vec<ModuleRecord>>>,
}

impl ModuleLoader {
    pub fn new(factory: Arc<dyn LoadContextFactory>, container: Arc<CapabilityContainer>) -> Self {
        Self {
            factory,
            container,
            late: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn container(&self) -> &Arc<CapabilityContainer> {
        &self.container
    }

    /// Takes the records of timed-out loads that have since completed.
    ///
    /// Until taken they are held by the loader, which keeps their modules
    /// leased.
    pub fn take_late_records(&self) -> Vec<ModuleRecord> {
        std::mem::take(&mut *self.late.lock())
    }

    /// Loads one module and lets it register its implementations.
    ///
    /// Blocks on file access. A registration failure is fatal to the module:
    /// its context is unloaded and the record reports the failure.
    pub fn load_module(&self, path: impl AsRef<Path>) -> ModuleRecord {
        let path = path.as_ref();
        let context = self.factory.create_load_context();
        debug!("Loading module {} into context {}", path.display(), context.id());

        let (outcome, residue) = match context.load(path) {
            Ok(module) => match self.register(&module) {
                Ok(()) => (Ok(module), None),
                Err(cause) => (Err(LoadFailure::new(path, cause)), Some(module)),
            },
            Err(failure) => (Err(failure), None),
        };

        match &outcome {
            Ok(module) => info!(
                "Loaded module {} v{} from {}",
                module.name(),
                module.version(),
                path.display()
            ),
            Err(failure) => {
                error!("Failed to load module from {}: {}", path.display(), failure.cause);
                context.unload();
            }
        }

        ModuleRecord {
            path: path.to_path_buf(),
            context: Some(context),
            outcome,
            residue,
        }
    }

    /// [`load_module`](Self::load_module) on the blocking thread pool.
    pub async fn load_module_async(&self, path: impl Into<PathBuf>) -> ModuleRecord {
        let path = path.into();
        let loader = self.clone();
        let task_path = path.clone();

        match tokio::task::spawn_blocking(move || loader.load_module(task_path)).await {
            Ok(record) => record,
            Err(e) => {
                error!("Module loading task for {} failed: {}", path.display(), e);
                ModuleRecord::failed(path, None, LoadCause::Interrupted(e.to_string()))
            }
        }
    }

    /// Loads a module, giving up after `timeout`.
    ///
    /// A timed-out load keeps running in the background and may still
    /// register its implementations; callers must not assume its bindings
    /// are absent.
    pub async fn load_module_within(&self, path: impl Into<PathBuf>, timeout: Option<Duration>) -> ModuleRecord {
        let path = path.into();
        let Some(limit) = timeout else {
            return self.load_module_async(path).await;
        };

        let loader = self.clone();
        let task_path = path.clone();
        let mut task = tokio::task::spawn_blocking(move || loader.load_module(task_path));

        match tokio::time::timeout(limit, &mut task).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                error!("Module loading task for {} failed: {}", path.display(), e);
                ModuleRecord::failed(path, None, LoadCause::Interrupted(e.to_string()))
            }
            Err(_) => {
                error!("Loading module {} timed out after {:?}", path.display(), limit);
                let late = self.late.clone();
                let late_path = path.clone();
                tokio::spawn(async move {
                    match task.await {
                        Ok(record) => {
                            if record.is_loaded() {
                                warn!("Module {} finished loading after its timeout", record.path.display());
                            }
                            late.lock().push(record);
                        }
                        Err(e) => {
                            error!(
                                "Timed-out module loading task for {} failed: {}",
                                late_path.display(),
                                e
                            );
                        }
                    }
                });
                ModuleRecord::failed(path, None, LoadCause::TimedOut(limit))
            }
        }
    }

    /// Lists loadable files in `directory`, sorted by path.
    ///
    /// A missing directory yields an empty list.
    pub async fn discover_modules(&self, directory: impl AsRef<Path>) -> Result<Vec<PathBuf>, DiscoveryError> {
        let directory = directory.as_ref();
        if !directory.exists() {
            warn!("Module directory does not exist: {}", directory.display());
            return Ok(Vec::new());
        }

        let discovery_error = |source| DiscoveryError {
            directory: directory.to_path_buf(),
            source,
        };
        let extensions = self.factory.module_extensions();
        let mut entries = tokio::fs::read_dir(directory).await.map_err(discovery_error)?;
        let mut modules = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(discovery_error)? {
            let path = entry.path();
            let loadable = path
                .extension()
                .map(|extension| extension.to_string_lossy())
                .is_some_and(|extension| extensions.iter().any(|known| *known == extension));
            if loadable {
                modules.push(path);
            }
        }

        modules.sort();
        debug!("Discovered {} modules in {}", modules.len(), directory.display());
        Ok(modules)
    }

    /// Loads every module in `directory` admitted by `options`.
    ///
    /// Modules load concurrently, each in its own context; one failure does
    /// not affect the others.
    pub async fn load_directory(
        &self,
        directory: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Vec<ModuleRecord>, DiscoveryError> {
        let directory = directory.as_ref();
        let discovered = self.discover_modules(directory).await?;
        info!("Loading modules from {}", directory.display());
        Ok(self.load_paths(discovered, options).await)
    }

    /// Loads each of `paths` admitted by `options`, concurrently and each in
    /// its own context.
    pub async fn load_paths(&self, paths: Vec<PathBuf>, options: &LoadOptions) -> Vec<ModuleRecord> {
        let selected: Vec<PathBuf> = paths.into_iter().filter(|path| options.admits(path)).collect();
        debug!("Loading {} modules", selected.len());

        let records = join_all(
            selected
                .into_iter()
                .map(|path| self.load_module_within(path, options.timeout)),
        )
        .await;

        let failed = records.iter().filter(|record| !record.is_loaded()).count();
        if failed > 0 {
            warn!("Failed to load {} modules", failed);
            for failure in records.iter().filter_map(|record| record.failure()) {
                warn!("  {}", failure);
            }
        }
        info!("✅ Loaded {}/{} modules", records.len() - failed, records.len());

        records
    }

    fn register(&self, module: &LoadedModule) -> Result<(), LoadCause> {
        match catch_unwind(AssertUnwindSafe(|| module.register(&self.container))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LoadCause::Registration(e)),
            Err(panic_info) => Err(LoadCause::Panicked(panic_message(panic_info))),
        }
    }
}

fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
