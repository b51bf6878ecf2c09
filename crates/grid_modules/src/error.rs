//! Error types for module loading.

use crate::context::ContextId;
use grid_capabilities::ContainerError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A module could not be loaded from `path`.
///
/// The [`ModuleLoader`](crate::ModuleLoader) absorbs these: they are logged
/// and returned in the [`ModuleRecord`](crate::ModuleRecord), never
/// propagated, so one bad module does not stop the others from loading.
#[derive(Debug, thiserror::Error)]
#[error("Failed to load module {}: {cause}", .path.display())]
pub struct LoadFailure {
    pub path: PathBuf,
    #[source]
    pub cause: LoadCause,
}

impl LoadFailure {
    pub fn new(path: impl AsRef<Path>, cause: LoadCause) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cause,
        }
    }
}

/// Why a module failed to load.
#[derive(Debug, thiserror::Error)]
pub enum LoadCause {
    #[error("module file not found")]
    Missing,
    #[error("malformed module: {0}")]
    Malformed(String),
    #[error("incompatible module ABI: host expects {expected}, module declares {found}")]
    AbiMismatch { expected: u32, found: u32 },
    #[error("unsatisfied dependency on shared type '{0}'")]
    UnsatisfiedDependency(String),
    /// The module was built against a different copy of a shared type or
    /// contract than the one the host resolves under that name.
    #[error("shared type '{name}' differs from the host's: host resolves {expected}, module was built against {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
    #[error("module '{0}' is already loaded in this context")]
    AlreadyLoaded(String),
    #[error("load context {0} has been unloaded")]
    ContextUnloaded(ContextId),
    #[error("module registration failed: {0}")]
    Registration(#[from] ContainerError),
    #[error("module panicked during registration: {0}")]
    Panicked(String),
    #[error("module loading task failed: {0}")]
    Interrupted(String),
    /// The load may still finish in the background and register bindings.
    #[error("module loading timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors raised while publishing host types.
#[derive(Debug, thiserror::Error)]
pub enum HostScopeError {
    #[error("Shared type '{name}' is already provided as {existing}, cannot provide it as {requested}")]
    Conflict {
        name: String,
        existing: String,
        requested: String,
    },
}

/// The module directory could not be scanned.
#[derive(Debug, thiserror::Error)]
#[error("Failed to read module directory {}: {source}", .directory.display())]
pub struct DiscoveryError {
    pub directory: PathBuf,
    #[source]
    pub source: std::io::Error,
}
