//! The capability container.
//!
//! Maps `(contract, name)` pairs to implementation factories. All mutation
//! goes through [`CapabilityContainer::register`]; all reads go through the
//! `resolve_*` family. Both are safe to call from any thread.

use crate::binding::{Binding, BindingInfo, Lifetime};
use crate::contract::{Contract, ContractId};
use crate::error::{ConstructionError, ContainerError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    contract: ContractId,
    name: String,
}

impl BindingKey {
    fn new<C: ?Sized + Contract>(name: &str) -> Self {
        Self {
            contract: ContractId::of::<C>(),
            name: name.to_string(),
        }
    }
}

/// Process-wide registry of named implementations.
///
/// The host constructs one container at startup and passes it (usually as
/// `Arc<CapabilityContainer>`) to module loaders and service connectors.
/// Bindings are never removed; the container lives until process exit.
#[derive(Default)]
pub struct CapabilityContainer {
    bindings: DashMap<BindingKey, Arc<Binding>>,
    /// Registration counter, used to report bindings in registration order
    sequence: AtomicU64,
}

impl CapabilityContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` as the implementation of `C` named `name`.
    ///
    /// The binding is fully built before it becomes visible, so any resolve
    /// that observes it also observes its factory.
    ///
    /// # Errors
    ///
    /// * `InvalidName` if `name` is empty or whitespace
    /// * `DuplicateName` if `(C, name)` is already bound; the existing
    ///   binding is left untouched
    ///
    /// A singleton factory must not resolve its own `(C, name)`: the
    /// resolve waits on the construction in progress and deadlocks. It may
    /// resolve any other binding.
    pub fn register<C, F>(&self, name: impl Into<String>, lifetime: Lifetime, factory: F) -> Result<(), ContainerError>
    where
        C: ?Sized + Contract,
        F: Fn() -> Result<Arc<C>, ConstructionError> + Send + Sync + 'static,
    {
        let name = Self::validate_name::<C>(name.into())?;
        self.insert::<C>(name, |name, sequence| Binding::new::<C, F>(name, lifetime, sequence, factory))
    }

    /// Registers an already constructed singleton.
    pub fn register_instance<C>(&self, name: impl Into<String>, instance: Arc<C>) -> Result<(), ContainerError>
    where
        C: ?Sized + Contract,
    {
        let name = Self::validate_name::<C>(name.into())?;
        self.insert::<C>(name, |name, sequence| Binding::with_instance::<C>(name, sequence, instance))
    }

    /// Resolves the implementation of `C` bound to `name`.
    ///
    /// Singletons are constructed at most once even when several threads race
    /// on the first resolve; the losers block until the winner is done. A
    /// failed construction is not cached.
    ///
    /// # Errors
    ///
    /// * `UnresolvedName` if nothing is bound; there is no default fallback
    /// * `ConstructionFailed` if the factory fails
    pub fn resolve_by_name<C>(&self, name: &str) -> Result<Arc<C>, ContainerError>
    where
        C: ?Sized + Contract,
    {
        // Clone the binding out so no map lock is held while a factory runs;
        // factories are free to resolve other bindings.
        let binding = self
            .bindings
            .get(&BindingKey::new::<C>(name))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ContainerError::UnresolvedName {
                contract: C::NAME,
                name: name.to_string(),
            })?;

        binding.materialize::<C>()
    }

    /// Resolves every implementation of `C`, in registration order.
    ///
    /// Returns an empty list when nothing is registered for `C`. The first
    /// construction failure aborts the call.
    pub fn resolve_all<C>(&self) -> Result<Vec<(String, Arc<C>)>, ContainerError>
    where
        C: ?Sized + Contract,
    {
        self.bindings_of::<C>()
            .into_iter()
            .map(|binding| {
                let instance = binding.materialize::<C>()?;
                Ok((binding.name().to_string(), instance))
            })
            .collect::<Result<Vec<_>, ContainerError>>()
    }

    /// Whether `(C, name)` is bound.
    pub fn contains<C: ?Sized + Contract>(&self, name: &str) -> bool {
        self.bindings.contains_key(&BindingKey::new::<C>(name))
    }

    /// Names bound for `C`, in registration order.
    pub fn names<C: ?Sized + Contract>(&self) -> Vec<String> {
        self.bindings_of::<C>()
            .iter()
            .map(|binding| binding.name().to_string())
            .collect()
    }

    /// Snapshot of all bindings, in registration order.
    pub fn bindings(&self) -> Vec<BindingInfo> {
        let mut bindings: Vec<Arc<Binding>> = self.bindings.iter().map(|entry| entry.value().clone()).collect();
        bindings.sort_by_key(|binding| binding.sequence());
        bindings.iter().map(|binding| binding.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn validate_name<C: ?Sized + Contract>(name: String) -> Result<String, ContainerError> {
        if name.trim().is_empty() {
            return Err(ContainerError::InvalidName { contract: C::NAME });
        }
        Ok(name)
    }

    fn insert<C: ?Sized + Contract>(
        &self,
        name: String,
        build: impl FnOnce(String, u64) -> Binding,
    ) -> Result<(), ContainerError> {
        match self.bindings.entry(BindingKey::new::<C>(&name)) {
            Entry::Occupied(_) => Err(ContainerError::DuplicateName {
                contract: C::NAME,
                name,
            }),
            Entry::Vacant(slot) => {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(Arc::new(build(name.clone(), sequence)));
                info!("Registered {} implementation '{}'", C::NAME, name);
                Ok(())
            }
        }
    }

    fn bindings_of<C: ?Sized + Contract>(&self) -> Vec<Arc<Binding>> {
        let contract = ContractId::of::<C>();
        let mut bindings: Vec<Arc<Binding>> = self
            .bindings
            .iter()
            .filter(|entry| entry.key().contract == contract)
            .map(|entry| entry.value().clone())
            .collect();
        bindings.sort_by_key(|binding| binding.sequence());
        debug!("Found {} bindings for {}", bindings.len(), C::NAME);
        bindings
    }
}
