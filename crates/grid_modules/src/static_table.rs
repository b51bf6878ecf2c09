//! Statically linked modules.
//!
//! Where shared libraries are unavailable or undesired, modules are linked
//! into the host and listed in a [`StaticModuleTable`]. A
//! [`StaticLoadContext`] then "loads" a module path by looking up the
//! path's stem in the table, so deployments keep the same module names and
//! the same named-resolution behaviour. Linked modules need no file on
//! disk.

use crate::context::{ContextCore, ContextId, LoadContext, LoadedModule, UnloadReport};
use crate::declaration::ModuleDeclaration;
use crate::error::{LoadCause, LoadFailure};
use crate::host::{HostScope, SharedType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Modules compiled into the binary, keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleTable {
    modules: HashMap<String, ModuleDeclaration>,
}

impl StaticModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. A later declaration with the same name replaces the
    /// earlier one.
    pub fn with_module(mut self, declaration: ModuleDeclaration) -> Self {
        self.insert(declaration);
        self
    }

    pub fn insert(&mut self, declaration: ModuleDeclaration) -> Option<ModuleDeclaration> {
        self.modules.insert(declaration.name.to_string(), declaration)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDeclaration> {
        self.modules.get(name)
    }

    /// Finds the module a file stands for.
    ///
    /// `asset_memory.module`, `libasset_memory.so` and `asset_memory.dll`
    /// all resolve to the module named `asset_memory`.
    pub fn find_for_path(&self, path: &Path) -> Option<&ModuleDeclaration> {
        let stem = path.file_stem()?.to_str()?;
        self.get(stem)
            .or_else(|| stem.strip_prefix("lib").and_then(|name| self.get(name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// One `<name>.module` path under `directory` per linked module, sorted.
    pub fn module_paths(&self, directory: impl AsRef<Path>) -> Vec<PathBuf> {
        let directory = directory.as_ref();
        self.names()
            .into_iter()
            .map(|name| directory.join(format!("{}.module", name)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Load context backed by a [`StaticModuleTable`].
///
/// A path naming a linked module loads whether or not a file exists there.
/// Any other path is `Missing` when absent and `Malformed` when present.
pub struct StaticLoadContext {
    core: ContextCore,
    table: Arc<StaticModuleTable>,
}

impl StaticLoadContext {
    pub fn new(host: Arc<HostScope>, table: Arc<StaticModuleTable>) -> Self {
        Self {
            core: ContextCore::new(host),
            table,
        }
    }
}

impl LoadContext for StaticLoadContext {
    fn id(&self) -> ContextId {
        self.core.id()
    }

    fn load(&self, path: &Path) -> Result<LoadedModule, LoadFailure> {
        self.core.ensure_active(path)?;

        let Some(declaration) = self.table.find_for_path(path) else {
            if !path.is_file() {
                return Err(LoadFailure::new(path, LoadCause::Missing));
            }
            return Err(LoadFailure::new(
                path,
                LoadCause::Malformed(format!(
                    "no statically linked module matches {}",
                    path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default()
                )),
            ));
        };

        debug!(
            "Resolved {} to static module {} in context {}",
            path.display(),
            declaration.name,
            self.core.id()
        );
        self.core.admit(path, declaration, Arc::new(()))
    }

    fn resolve_type(&self, name: &str) -> Option<Arc<SharedType>> {
        self.core.resolve_type(name)
    }

    fn modules(&self) -> Vec<LoadedModule> {
        self.core.modules()
    }

    fn unload(&self) -> UnloadReport {
        self.core.unload()
    }

    fn is_unloaded(&self) -> bool {
        self.core.is_unloaded()
    }
}
