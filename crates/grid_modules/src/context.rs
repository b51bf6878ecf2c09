//! Load contexts: isolated, unloadable scopes for loaded modules.

use crate::declaration::{ModuleDeclaration, RegisterFn, MODULE_ABI_VERSION};
use crate::error::{LoadCause, LoadFailure};
use crate::host::{HostScope, SharedType, TypeOrigin};
use grid_capabilities::{CapabilityContainer, ContainerError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier of a load context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An isolated scope that owns loaded modules and can be unloaded.
///
/// Every context is collectible. Type lookups it cannot satisfy from its own
/// modules are deferred to the host's [`HostScope`], and host types always
/// win: a context never admits its own copy of a type the host provides.
/// A module whose build of a required type differs from the one resolved
/// under that name is refused with [`LoadCause::TypeMismatch`].
pub trait LoadContext: Send + Sync {
    fn id(&self) -> ContextId;

    /// Loads the module at `path` into this context.
    ///
    /// Blocks for the duration of file access.
    fn load(&self, path: &Path) -> Result<LoadedModule, LoadFailure>;

    /// Resolves a shared type, host first, then this context's exports.
    fn resolve_type(&self, name: &str) -> Option<Arc<SharedType>>;

    /// Modules currently owned by this context.
    fn modules(&self) -> Vec<LoadedModule>;

    /// Releases this context's modules and refuses further loads.
    ///
    /// A module is reclaimed once the last [`LoadedModule`] handle to it is
    /// dropped; the report says how many are still held elsewhere. Shared
    /// library code stays mapped even then, see [`LibraryLoadContext`].
    ///
    /// [`LibraryLoadContext`]: crate::LibraryLoadContext
    fn unload(&self) -> UnloadReport;

    fn is_unloaded(&self) -> bool;

    fn is_collectible(&self) -> bool {
        true
    }
}

/// Outcome of [`LoadContext::unload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnloadReport {
    pub context: ContextId,
    /// Modules the context let go of
    pub released: usize,
    /// Of those, modules still referenced outside the context
    pub still_referenced: usize,
}

/// Keeps a module's resources alive for as long as any handle to it lives.
pub(crate) type ModuleLease = Arc<dyn Any + Send + Sync>;

/// Handle to a module loaded into a context.
#[derive(Clone)]
pub struct LoadedModule {
    name: String,
    version: String,
    path: PathBuf,
    context: ContextId,
    dependencies: Vec<Arc<SharedType>>,
    exports: Vec<Arc<SharedType>>,
    // `register` points into the module's code.
    register: RegisterFn,
    lease: ModuleLease,
}

impl LoadedModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Shared types resolved for the module's declared dependencies.
    pub fn dependencies(&self) -> &[Arc<SharedType>] {
        &self.dependencies
    }

    pub fn dependency(&self, name: &str) -> Option<&Arc<SharedType>> {
        self.dependencies.iter().find(|shared| shared.name() == name)
    }

    /// Types this module added to its context.
    pub fn exports(&self) -> &[Arc<SharedType>] {
        &self.exports
    }

    /// Runs the module's registration entry point.
    pub fn register(&self, container: &CapabilityContainer) -> Result<(), ContainerError> {
        (self.register)(container)
    }

    /// Weak handle to the module's lease; it stops upgrading once the module
    /// has been reclaimed.
    pub fn reclaim_watch(&self) -> Weak<dyn Any + Send + Sync> {
        Arc::downgrade(&self.lease)
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("path", &self.path)
            .field("context", &self.context)
            .field(
                "dependencies",
                &self.dependencies.iter().map(|shared| shared.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[derive(Default)]
struct ContextState {
    modules: Vec<LoadedModule>,
    exports: HashMap<String, Arc<SharedType>>,
    unloaded: bool,
}

/// State and admission rules shared by every context implementation.
///
/// Concrete contexts only differ in how they turn a path into a
/// [`ModuleDeclaration`]; everything after that goes through [`admit`].
///
/// [`admit`]: ContextCore::admit
pub(crate) struct ContextCore {
    id: ContextId,
    host: Arc<HostScope>,
    state: Mutex<ContextState>,
}

impl ContextCore {
    pub(crate) fn new(host: Arc<HostScope>) -> Self {
        Self {
            id: ContextId::new(),
            host,
            state: Mutex::new(ContextState::default()),
        }
    }

    pub(crate) fn id(&self) -> ContextId {
        self.id
    }

    pub(crate) fn ensure_active(&self, path: &Path) -> Result<(), LoadFailure> {
        if self.state.lock().unloaded {
            return Err(LoadFailure::new(path, LoadCause::ContextUnloaded(self.id)));
        }
        Ok(())
    }

    /// Validates `declaration`, resolves its dependencies and records the
    /// module in this context.
    pub(crate) fn admit(
        &self,
        path: &Path,
        declaration: &ModuleDeclaration,
        lease: ModuleLease,
    ) -> Result<LoadedModule, LoadFailure> {
        let fail = |cause| LoadFailure::new(path, cause);
        let mut state = self.state.lock();

        if state.unloaded {
            return Err(fail(LoadCause::ContextUnloaded(self.id)));
        }
        if declaration.abi_version != MODULE_ABI_VERSION {
            return Err(fail(LoadCause::AbiMismatch {
                expected: MODULE_ABI_VERSION,
                found: declaration.abi_version,
            }));
        }
        if declaration.name.trim().is_empty() {
            return Err(fail(LoadCause::Malformed("module declares an empty name".to_string())));
        }
        if state.modules.iter().any(|module| module.name == declaration.name) {
            return Err(fail(LoadCause::AlreadyLoaded(declaration.name.to_string())));
        }

        let mut dependencies = Vec::with_capacity(declaration.requires.len());
        for describe in declaration.requires {
            let wanted = describe();
            let shared = self
                .resolve_with(&state, wanted.name())
                .ok_or_else(|| fail(LoadCause::UnsatisfiedDependency(wanted.name().to_string())))?;
            if !shared.same_type(&wanted) {
                return Err(fail(LoadCause::TypeMismatch {
                    name: wanted.name().to_string(),
                    expected: shared.type_name().to_string(),
                    found: wanted.type_name().to_string(),
                }));
            }
            dependencies.push(shared);
        }

        let mut exports = Vec::new();
        for export in declaration.exports {
            let shared = export();
            if self.host.contains(shared.name()) {
                debug!(
                    "Module {} exports '{}', which the host already provides; deferring to the host type",
                    declaration.name,
                    shared.name()
                );
                continue;
            }
            if state.exports.contains_key(shared.name()) {
                debug!(
                    "Shared type '{}' already exported in context {}, keeping the first",
                    shared.name(),
                    self.id
                );
                continue;
            }
            let shared = Arc::new(shared.with_origin(TypeOrigin::Context(self.id)));
            state.exports.insert(shared.name().to_string(), shared.clone());
            exports.push(shared);
        }

        let module = LoadedModule {
            name: declaration.name.to_string(),
            version: declaration.version.to_string(),
            path: path.to_path_buf(),
            context: self.id,
            dependencies,
            exports,
            register: declaration.register,
            lease,
        };
        state.modules.push(module.clone());

        Ok(module)
    }

    pub(crate) fn resolve_type(&self, name: &str) -> Option<Arc<SharedType>> {
        let state = self.state.lock();
        self.resolve_with(&state, name)
    }

    fn resolve_with(&self, state: &ContextState, name: &str) -> Option<Arc<SharedType>> {
        self.host
            .lookup(name)
            .or_else(|| state.exports.get(name).cloned())
    }

    pub(crate) fn modules(&self) -> Vec<LoadedModule> {
        self.state.lock().modules.clone()
    }

    pub(crate) fn unload(&self) -> UnloadReport {
        let released = {
            let mut state = self.state.lock();
            state.unloaded = true;
            state.exports.clear();
            std::mem::take(&mut state.modules)
        };

        // Each released handle holds one lease reference itself.
        let still_referenced = released
            .iter()
            .filter(|module| Arc::strong_count(&module.lease) > 1)
            .count();

        if !released.is_empty() {
            info!(
                "Unloaded context {}: released {} modules, {} still referenced",
                self.id,
                released.len(),
                still_referenced
            );
        }

        UnloadReport {
            context: self.id,
            released: released.len(),
            still_referenced,
        }
    }

    pub(crate) fn is_unloaded(&self) -> bool {
        self.state.lock().unloaded
    }
}
