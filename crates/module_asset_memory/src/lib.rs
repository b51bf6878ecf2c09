//! In-memory asset services.
//!
//! Registers two implementations of [`AssetService`]:
//!
//! - `MemoryAssetService`: keeps assets in a concurrent map for the life of
//!   the process
//! - `NullAssetService`: accepts everything and keeps nothing
//!
//! Build with `--features dynamic` to produce a loadable shared library;
//! without it the crate is linked into the host and listed in its static
//! module table.

use async_trait::async_trait;
use dashmap::DashMap;
use grid_capabilities::{CapabilityContainer, ContainerError, Lifetime};
use grid_modules::{ModuleDeclaration, SharedType, MODULE_ABI_VERSION};
use grid_services::{shared_types, AssetBase, AssetMetadata, AssetService, ServiceError};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const MEMORY_ASSET_SERVICE: &str = "MemoryAssetService";
pub const NULL_ASSET_SERVICE: &str = "NullAssetService";

pub const DECLARATION: ModuleDeclaration = ModuleDeclaration {
    abi_version: MODULE_ABI_VERSION,
    name: "module_asset_memory",
    version: env!("CARGO_PKG_VERSION"),
    requires: &[
        || SharedType::of::<AssetBase>(shared_types::ASSET_BASE),
        || SharedType::of::<AssetMetadata>(shared_types::ASSET_METADATA),
        SharedType::contract::<dyn AssetService>,
    ],
    exports: &[],
    register,
};

#[cfg(feature = "dynamic")]
grid_modules::declare_grid_module!(DECLARATION);

fn register(container: &CapabilityContainer) -> Result<(), ContainerError> {
    container.register::<dyn AssetService, _>(MEMORY_ASSET_SERVICE, Lifetime::Singleton, || {
        info!("📦 Creating in-memory asset store");
        Ok(Arc::new(MemoryAssetService::new()) as Arc<dyn AssetService>)
    })?;
    container.register::<dyn AssetService, _>(NULL_ASSET_SERVICE, Lifetime::Singleton, || {
        Ok(Arc::new(NullAssetService) as Arc<dyn AssetService>)
    })?;
    Ok(())
}

/// Asset store backed by a [`DashMap`].
#[derive(Default)]
pub struct MemoryAssetService {
    assets: DashMap<Uuid, AssetBase>,
}

impl MemoryAssetService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[async_trait]
impl AssetService for MemoryAssetService {
    async fn get(&self, id: Uuid) -> Result<Option<AssetBase>, ServiceError> {
        Ok(self.assets.get(&id).map(|asset| asset.clone()))
    }

    async fn get_metadata(&self, id: Uuid) -> Result<Option<AssetMetadata>, ServiceError> {
        Ok(self.assets.get(&id).map(|asset| asset.metadata.clone()))
    }

    async fn get_data(&self, id: Uuid) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.assets.get(&id).map(|asset| asset.data.clone()))
    }

    /// A nil id is replaced by a fresh one.
    async fn store(&self, mut asset: AssetBase) -> Result<Uuid, ServiceError> {
        if asset.metadata.id.is_nil() {
            asset.metadata.id = Uuid::new_v4();
        }
        let id = asset.id();
        debug!("Storing asset {} ({} bytes)", id, asset.data.len());
        self.assets.insert(id, asset);
        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.assets.remove(&id).is_some())
    }

    async fn exists(&self, ids: &[Uuid]) -> Result<Vec<bool>, ServiceError> {
        Ok(ids.iter().map(|id| self.assets.contains_key(id)).collect())
    }
}

/// Discards everything it is given.
pub struct NullAssetService;

#[async_trait]
impl AssetService for NullAssetService {
    async fn get(&self, _id: Uuid) -> Result<Option<AssetBase>, ServiceError> {
        Ok(None)
    }

    async fn get_metadata(&self, _id: Uuid) -> Result<Option<AssetMetadata>, ServiceError> {
        Ok(None)
    }

    async fn get_data(&self, _id: Uuid) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(None)
    }

    async fn store(&self, asset: AssetBase) -> Result<Uuid, ServiceError> {
        Ok(asset.id())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, ServiceError> {
        Ok(false)
    }

    async fn exists(&self, ids: &[Uuid]) -> Result<Vec<bool>, ServiceError> {
        Ok(vec![false; ids.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let service = MemoryAssetService::new();
        let id = Uuid::new_v4();
        service.store(AssetBase::new(id, "bark", 0, vec![4, 2])).await.unwrap();

        assert_eq!(service.get_data(id).await.unwrap(), Some(vec![4, 2]));
        assert_eq!(service.get_metadata(id).await.unwrap().unwrap().name, "bark");
        assert_eq!(service.exists(&[id, Uuid::new_v4()]).await.unwrap(), vec![true, false]);
        assert!(service.delete(id).await.unwrap());
        assert!(service.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nil_id_is_assigned() {
        let service = MemoryAssetService::new();
        let id = service.store(AssetBase::new(Uuid::nil(), "fresh", 0, Vec::new())).await.unwrap();
        assert!(!id.is_nil());
        assert!(service.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_registers_both_implementations() {
        let container = CapabilityContainer::new();
        (DECLARATION.register)(&container).unwrap();
        assert_eq!(
            container.names::<dyn AssetService>(),
            vec![MEMORY_ASSET_SERVICE.to_string(), NULL_ASSET_SERVICE.to_string()]
        );

        let null = container.resolve_by_name::<dyn AssetService>(NULL_ASSET_SERVICE).unwrap();
        let id = null.store(AssetBase::new(Uuid::new_v4(), "void", 0, vec![1])).await.unwrap();
        assert_eq!(null.exists(&[id]).await.unwrap(), vec![false]);

        // Registering twice collides on the first name.
        assert!(matches!(
            (DECLARATION.register)(&container),
            Err(ContainerError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_declaration_requires_the_service_contract() {
        let required: Vec<SharedType> = DECLARATION.requires.iter().map(|describe| describe()).collect();
        let names: Vec<&str> = required.iter().map(|shared| shared.name()).collect();
        assert_eq!(names, vec!["AssetBase", "AssetMetadata", "AssetService"]);
        assert!(required[2].is::<dyn AssetService>());
        assert!(required[0].is::<AssetBase>());
    }
}
