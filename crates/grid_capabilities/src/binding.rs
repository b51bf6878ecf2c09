//! Named bindings and their lifetimes.

use crate::contract::{Contract, ContractId};
use crate::error::{ConstructionError, ContainerError};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// How often a binding's factory runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// Constructed on first resolve; every later resolve returns that instance
    Singleton,
    /// Constructed anew on every resolve
    Transient,
}

/// Type-erased instance. Always holds an `Arc<C>` for the binding's contract.
type ErasedInstance = Box<dyn Any + Send + Sync>;

type ErasedFactory = Box<dyn Fn() -> Result<ErasedInstance, ConstructionError> + Send + Sync>;

/// A single `(contract, name) -> factory` registration.
pub(crate) struct Binding {
    contract: ContractId,
    name: String,
    lifetime: Lifetime,
    sequence: u64,
    factory: ErasedFactory,
    instance: OnceCell<ErasedInstance>,
}

impl Binding {
    pub(crate) fn new<C, F>(name: String, lifetime: Lifetime, sequence: u64, factory: F) -> Self
    where
        C: ?Sized + Contract,
        F: Fn() -> Result<Arc<C>, ConstructionError> + Send + Sync + 'static,
    {
        Self {
            contract: ContractId::of::<C>(),
            name,
            lifetime,
            sequence,
            factory: Box::new(move || factory().map(|instance| Box::new(instance) as ErasedInstance)),
            instance: OnceCell::new(),
        }
    }

    /// Singleton binding whose instance already exists.
    pub(crate) fn with_instance<C: ?Sized + Contract>(name: String, sequence: u64, instance: Arc<C>) -> Self {
        let factory_instance = instance.clone();
        let binding = Self::new::<C, _>(name, Lifetime::Singleton, sequence, move || {
            Ok(factory_instance.clone())
        });
        // Freshly created cell, so this cannot already be set.
        let _ = binding.instance.set(Box::new(instance));
        binding
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Produces the instance for this binding.
    ///
    /// Singletons go through the `OnceCell`: concurrent first callers block
    /// until the winning thread finishes, and a failed construction leaves
    /// the cell empty so a later call constructs again.
    pub(crate) fn materialize<C: ?Sized + Contract>(&self) -> Result<Arc<C>, ContainerError> {
        match self.lifetime {
            Lifetime::Singleton => {
                let erased = self
                    .instance
                    .get_or_try_init(|| (self.factory)())
                    .map_err(|source| self.construction_failed(source))?;
                self.downcast::<C>(erased)
            }
            Lifetime::Transient => {
                let erased = (self.factory)().map_err(|source| self.construction_failed(source))?;
                self.downcast::<C>(&erased)
            }
        }
    }

    pub(crate) fn info(&self) -> BindingInfo {
        BindingInfo {
            contract: self.contract.name(),
            name: self.name.clone(),
            lifetime: self.lifetime,
            materialized: self.instance.get().is_some(),
        }
    }

    fn downcast<C: ?Sized + Contract>(&self, erased: &ErasedInstance) -> Result<Arc<C>, ContainerError> {
        erased
            .downcast_ref::<Arc<C>>()
            .cloned()
            .ok_or_else(|| ContainerError::ContractMismatch {
                contract: C::NAME,
                name: self.name.clone(),
            })
    }

    fn construction_failed(&self, source: ConstructionError) -> ContainerError {
        ContainerError::ConstructionFailed {
            contract: self.contract.name(),
            name: self.name.clone(),
            source,
        }
    }
}

/// Snapshot of a binding for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingInfo {
    pub contract: &'static str,
    pub name: String,
    pub lifetime: Lifetime,
    /// Whether a singleton instance has been constructed
    pub materialized: bool,
}
