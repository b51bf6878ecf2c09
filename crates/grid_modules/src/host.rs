//! Host-provided shared types.
//!
//! The [`HostScope`] is the process's default loading mechanism. Load
//! contexts consult it before anything of their own, so every module that
//! needs a framework type receives the host's descriptor for it, the same
//! `Arc` in every context.

use crate::context::ContextId;
use crate::error::HostScopeError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use grid_capabilities::Contract;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// Where a shared type descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Provided by the host process
    Host,
    /// Exported by a module inside the given load context
    Context(ContextId),
}

/// Descriptor of a type that crosses the module boundary.
///
/// Owns all of its data, so a descriptor built by module code stays valid
/// after that module is released.
#[derive(Debug, Clone)]
pub struct SharedType {
    name: String,
    type_id: TypeId,
    type_name: String,
    origin: TypeOrigin,
}

impl SharedType {
    /// Describes `T`, published under `name`.
    ///
    /// The `TypeId` is that of the build calling this: a module library
    /// calling it describes its own idea of `T`.
    pub fn of<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>().to_string(),
            origin: TypeOrigin::Host,
        }
    }

    /// Describes contract `C`, published under its contract name.
    pub fn contract<C: ?Sized + Contract>() -> Self {
        Self::of::<C>(C::NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn origin(&self) -> TypeOrigin {
        self.origin
    }

    /// Whether this descriptor describes `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Whether `other` describes the same type, whatever it is named.
    pub fn same_type(&self, other: &SharedType) -> bool {
        self.type_id == other.type_id
    }

    pub(crate) fn with_origin(mut self, origin: TypeOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// Registry of the framework types the host shares with every module.
#[derive(Default)]
pub struct HostScope {
    types: DashMap<String, Arc<SharedType>>,
}

impl HostScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `T` under `name`.
    ///
    /// Providing the same type under the same name again returns the
    /// existing descriptor. A different type under a taken name is refused.
    pub fn provide<T: ?Sized + 'static>(&self, name: impl Into<String>) -> Result<Arc<SharedType>, HostScopeError> {
        let name = name.into();
        match self.types.entry(name.clone()) {
            Entry::Occupied(existing) => {
                let existing = existing.get();
                if existing.is::<T>() {
                    Ok(existing.clone())
                } else {
                    Err(HostScopeError::Conflict {
                        name,
                        existing: existing.type_name().to_string(),
                        requested: std::any::type_name::<T>().to_string(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                let shared = Arc::new(SharedType::of::<T>(name.clone()));
                slot.insert(shared.clone());
                debug!("Host provides shared type '{}' ({})", name, shared.type_name());
                Ok(shared)
            }
        }
    }

    /// Publishes contract `C` under its contract name, so modules
    /// registering implementations of it are checked against the host's
    /// `C` when they load.
    pub fn provide_contract<C: ?Sized + Contract>(&self) -> Result<Arc<SharedType>, HostScopeError> {
        self.provide::<C>(C::NAME)
    }

    /// Looks up a host type by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<SharedType>> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Names of all provided types, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}
