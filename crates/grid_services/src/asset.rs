//! Asset service contract and the asset types it trades in.

use async_trait::async_trait;
use grid_capabilities::declare_contract;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Descriptive part of an asset, without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Numeric asset type (texture, sound, notecard, ...)
    pub asset_type: i8,
    /// Local assets are never shared with other grid services
    #[serde(default)]
    pub local: bool,
    /// Temporary assets are not persisted
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub creator_id: String,
}

/// A complete asset: metadata plus raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBase {
    #[serde(flatten)]
    pub metadata: AssetMetadata,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl AssetBase {
    pub fn new(id: Uuid, name: impl Into<String>, asset_type: i8, data: Vec<u8>) -> Self {
        Self {
            metadata: AssetMetadata {
                id,
                name: name.into(),
                description: String::new(),
                asset_type,
                local: false,
                temporary: false,
                creator_id: String::new(),
            },
            data,
        }
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }
}

/// Errors a service implementation reports to its callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request was understood but refused
    #[error("Request rejected: {0}")]
    Rejected(String),
    /// The request payload was not valid for the operation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The method is not part of the service
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    /// Backend failure
    #[error("Internal service error: {0}")]
    Internal(String),
}

/// Storage and retrieval of assets.
///
/// The grid ships several implementations of this contract; connectors pick
/// one by the name configured in their section.
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Fetches a complete asset.
    async fn get(&self, id: Uuid) -> Result<Option<AssetBase>, ServiceError>;

    /// Fetches only the metadata of an asset.
    async fn get_metadata(&self, id: Uuid) -> Result<Option<AssetMetadata>, ServiceError>;

    /// Fetches only the payload of an asset.
    async fn get_data(&self, id: Uuid) -> Result<Option<Vec<u8>>, ServiceError>;

    /// Stores an asset and returns the id it was stored under.
    async fn store(&self, asset: AssetBase) -> Result<Uuid, ServiceError>;

    /// Deletes an asset. Returns whether something was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;

    /// Reports, for each id, whether the asset exists.
    async fn exists(&self, ids: &[Uuid]) -> Result<Vec<bool>, ServiceError>;
}

declare_contract!(dyn AssetService, "AssetService");
