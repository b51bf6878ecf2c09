//! Connector for [`AssetService`].

use crate::connector::ServiceConnector;
use crate::dispatcher::RequestHandler;
use async_trait::async_trait;
use grid_services::{AssetBase, AssetService, ServiceError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Exposes an [`AssetService`] implementation on the `assets` route.
pub struct AssetServiceConnector {
    service: Arc<dyn AssetService>,
}

impl AssetServiceConnector {
    pub fn service(&self) -> &Arc<dyn AssetService> {
        &self.service
    }
}

impl ServiceConnector for AssetServiceConnector {
    type Contract = dyn AssetService;
    const ROUTE: &'static str = "assets";

    fn connect(service: Arc<dyn AssetService>) -> Self {
        Self { service }
    }
}

#[derive(Deserialize)]
struct ById {
    id: Uuid,
}

#[derive(Deserialize)]
struct ByIds {
    ids: Vec<Uuid>,
}

fn params<T: DeserializeOwned>(data: Value) -> Result<T, ServiceError> {
    serde_json::from_value(data).map_err(|e| ServiceError::InvalidRequest(e.to_string()))
}

fn reply<T: serde::Serialize>(value: T) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

#[async_trait]
impl RequestHandler for AssetServiceConnector {
    async fn handle(&self, method: &str, data: Value) -> Result<Value, ServiceError> {
        match method {
            "get" => reply(self.service.get(params::<ById>(data)?.id).await?),
            "get_metadata" => reply(self.service.get_metadata(params::<ById>(data)?.id).await?),
            "get_data" => reply(self.service.get_data(params::<ById>(data)?.id).await?),
            "store" => {
                let asset: AssetBase = params(data)?;
                let id = self.service.store(asset).await?;
                Ok(json!({ "id": id }))
            }
            "delete" => {
                let deleted = self.service.delete(params::<ById>(data)?.id).await?;
                Ok(json!({ "deleted": deleted }))
            }
            "exists" => reply(self.service.exists(&params::<ByIds>(data)?.ids).await?),
            other => Err(ServiceError::UnknownMethod(other.to_string())),
        }
    }
}
