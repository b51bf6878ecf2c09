//! Shared-library load context.

use crate::context::{ContextCore, ContextId, LoadContext, LoadedModule, UnloadReport};
use crate::declaration::{ModuleDeclaration, ABI_VERSION_SYMBOL, DECLARATION_SYMBOL, MODULE_ABI_VERSION};
use crate::error::{LoadCause, LoadFailure};
use crate::host::{HostScope, SharedType};
use libloading::{Library, Symbol};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A module library that is never closed.
///
/// Rust libraries leave thread-local destructors and other callbacks
/// pointing into their code once they have run, and closing one under them
/// crashes the process. The lease is still dropped like any other, so
/// reclamation reporting works the same for every context; only the
/// mapping outlives it.
struct ResidentLibrary {
    path: PathBuf,
    library: ManuallyDrop<Library>,
}

impl Drop for ResidentLibrary {
    fn drop(&mut self) {
        debug!(
            "Released module library {}; its code stays mapped until exit",
            self.path.display()
        );
    }
}

/// Loads modules from shared libraries (`.so`, `.dll`, `.dylib`).
///
/// Unloading the context drops the context's own module handles. A
/// library, once opened, stays mapped for the life of the process.
pub struct LibraryLoadContext {
    core: ContextCore,
}

impl LibraryLoadContext {
    pub fn new(host: Arc<HostScope>) -> Self {
        Self {
            core: ContextCore::new(host),
        }
    }

    /// Opens the library and copies out its declaration.
    ///
    /// The ABI version is checked before the declaration is read, since a
    /// different ABI may lay the declaration out differently.
    fn open(path: &Path) -> Result<(ResidentLibrary, ModuleDeclaration), LoadFailure> {
        let fail = |cause| LoadFailure::new(path, cause);

        // Safety: opening a library runs its initialisers. Modules are
        // trusted code built against this crate.
        let library = unsafe { Library::new(path) }
            .map_err(|e| fail(LoadCause::Malformed(format!("failed to open library: {}", e))))?;
        let resident = ResidentLibrary {
            path: path.to_path_buf(),
            library: ManuallyDrop::new(library),
        };
        let library = &*resident.library;

        let abi_version = unsafe {
            let abi_version: Symbol<unsafe extern "C" fn() -> u32> = library.get(ABI_VERSION_SYMBOL).map_err(|e| {
                fail(LoadCause::Malformed(format!("missing grid_module_abi_version export: {}", e)))
            })?;
            abi_version()
        };

        if abi_version != MODULE_ABI_VERSION {
            return Err(fail(LoadCause::AbiMismatch {
                expected: MODULE_ABI_VERSION,
                found: abi_version,
            }));
        }

        let declaration = unsafe {
            let declare: Symbol<unsafe extern "C" fn() -> *const ModuleDeclaration> =
                library.get(DECLARATION_SYMBOL).map_err(|e| {
                    fail(LoadCause::Malformed(format!("missing grid_module_declaration export: {}", e)))
                })?;
            let declaration = declare();
            if declaration.is_null() {
                return Err(fail(LoadCause::Malformed("module returned a null declaration".to_string())));
            }
            // Strings and function pointers in the copy point into the
            // library, which is never closed.
            *declaration
        };

        Ok((resident, declaration))
    }
}

impl LoadContext for LibraryLoadContext {
    fn id(&self) -> ContextId {
        self.core.id()
    }

    fn load(&self, path: &Path) -> Result<LoadedModule, LoadFailure> {
        self.core.ensure_active(path)?;
        if !path.is_file() {
            return Err(LoadFailure::new(path, LoadCause::Missing));
        }

        debug!("Opening module library {} in context {}", path.display(), self.core.id());
        let (library, declaration) = Self::open(path)?;
        self.core.admit(path, &declaration, Arc::new(library))
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
