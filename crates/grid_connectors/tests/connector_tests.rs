use async_trait::async_trait;
use grid_capabilities::{CapabilityContainer, ConstructionError, ContainerError, Lifetime};
use grid_connectors::{
    initialize, AssetServiceConnector, ConnectorError, ConnectorSection, ConnectorSections, DispatchError,
    RequestDispatcher,
};
use grid_services::{AssetBase, AssetMetadata, AssetService, ServiceError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct FakeAssets {
    assets: Mutex<HashMap<Uuid, AssetBase>>,
}

#[async_trait]
impl AssetService for FakeAssets {
    async fn get(&self, id: Uuid) -> Result<Option<AssetBase>, ServiceError> {
        Ok(self.assets.lock().unwrap().get(&id).cloned())
    }

    async fn get_metadata(&self, id: Uuid) -> Result<Option<AssetMetadata>, ServiceError> {
        Ok(self.get(id).await?.map(|asset| asset.metadata))
    }

    async fn get_data(&self, id: Uuid) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.get(id).await?.map(|asset| asset.data))
    }

    async fn store(&self, asset: AssetBase) -> Result<Uuid, ServiceError> {
        let id = asset.id();
        self.assets.lock().unwrap().insert(id, asset);
        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.assets.lock().unwrap().remove(&id).is_some())
    }

    async fn exists(&self, ids: &[Uuid]) -> Result<Vec<bool>, ServiceError> {
        let assets = self.assets.lock().unwrap();
        Ok(ids.iter().map(|id| assets.contains_key(id)).collect())
    }
}

/// Container with one asset implementation that counts its constructions.
fn container_with_counter() -> (CapabilityContainer, Arc<AtomicUsize>) {
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = constructed.clone();
    let container = CapabilityContainer::new();
    container
        .register::<dyn AssetService, _>("AssetServiceConnector", Lifetime::Singleton, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeAssets::default()) as Arc<dyn AssetService>)
        })
        .unwrap();
    (container, constructed)
}

fn sections_from(text: &str) -> ConnectorSections {
    #[derive(serde::Deserialize)]
    struct File {
        connectors: ConnectorSections,
    }
    toml::from_str::<File>(text).unwrap().connectors
}

#[tokio::test]
async fn test_connector_resolves_configured_implementation() {
    let (container, constructed) = container_with_counter();
    let dispatcher = RequestDispatcher::new();
    let sections = sections_from(
        r#"
        [connectors.AssetService]
        implementation = "AssetServiceConnector"
        cache_size = 512
        "#,
    );
    assert_eq!(sections.get("AssetService").unwrap().settings["cache_size"], json!(512));

    let connector = initialize::<AssetServiceConnector>("AssetService", &sections, &container, &dispatcher).unwrap();
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    let resolved = container.resolve_by_name::<dyn AssetService>("AssetServiceConnector").unwrap();
    assert!(Arc::ptr_eq(connector.service(), &resolved));

    let id = Uuid::new_v4();
    let asset = AssetBase::new(id, "granite", 0, vec![9, 9]);
    let stored = dispatcher
        .dispatch(&json!({"route": "assets", "method": "store", "data": asset}).to_string())
        .await
        .unwrap();
    assert_eq!(stored, json!({ "id": id }));

    let fetched = dispatcher
        .dispatch(&json!({"route": "assets", "method": "get", "data": {"id": id}}).to_string())
        .await
        .unwrap();
    assert_eq!(serde_json::from_value::<AssetBase>(fetched).unwrap(), asset);

    let other = Uuid::new_v4();
    let exists = dispatcher
        .dispatch(&json!({"route": "assets", "method": "exists", "data": {"ids": [id, other]}}).to_string())
        .await
        .unwrap();
    assert_eq!(exists, json!([true, false]));

    assert!(matches!(
        dispatcher
            .dispatch(&json!({"route": "assets", "method": "get", "data": {"id": "nope"}}).to_string())
            .await,
        Err(DispatchError::Service(ServiceError::InvalidRequest(_)))
    ));
}

#[test]
fn test_wrong_name_is_unresolved() {
    let (container, constructed) = container_with_counter();
    let dispatcher = RequestDispatcher::new();
    let sections =
        ConnectorSections::new().with_section("AssetService", ConnectorSection::with_implementation("DoesNotExist"));

    let err = initialize::<AssetServiceConnector>("AssetService", &sections, &container, &dispatcher)
        .err()
        .unwrap();
    match err {
        ConnectorError::Resolution(ContainerError::UnresolvedName { contract, name }) => {
            assert_eq!(contract, "AssetService");
            assert_eq!(name, "DoesNotExist");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(constructed.load(Ordering::SeqCst), 0);
    assert!(dispatcher.routes().is_empty());
}

#[test]
fn test_missing_key_fails_before_resolution() {
    let (container, constructed) = container_with_counter();
    let dispatcher = RequestDispatcher::new();
    let sections = sections_from(
        r#"
        [connectors.AssetService]
        auth_type = "None"
        "#,
    );

    let err = initialize::<AssetServiceConnector>("AssetService", &sections, &container, &dispatcher)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ConnectorError::MissingConfiguration { ref section, key: Some("implementation") } if section == "AssetService"
    ));
    assert_eq!(constructed.load(Ordering::SeqCst), 0);

    let err = initialize::<AssetServiceConnector>("GridService", &sections, &container, &dispatcher)
        .err()
        .unwrap();
    assert!(matches!(err, ConnectorError::MissingConfiguration { key: None, .. }));
}

#[test]
fn test_construction_failure_propagates() {
    let container = CapabilityContainer::new();
    container
        .register::<dyn AssetService, _>("Broken", Lifetime::Singleton, || {
            Err(ConstructionError::new("backing store unreachable"))
        })
        .unwrap();
    let sections = ConnectorSections::new().with_section("AssetService", ConnectorSection::with_implementation("Broken"));

    let err = initialize::<AssetServiceConnector>("AssetService", &sections, &container, &RequestDispatcher::new())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ConnectorError::Resolution(ContainerError::ConstructionFailed { .. })
    ));
}

#[tokio::test]
async fn test_protected_route_and_second_connector() {
    let (container, _) = container_with_counter();
    let dispatcher = RequestDispatcher::new();
    let sections = sections_from(
        r#"
        [connectors.AssetService]
        implementation = "AssetServiceConnector"
        auth_type = "BasicHttpAuthentication"
        http_auth_username = "grid"
        http_auth_password = "secret"
        "#,
    );

    initialize::<AssetServiceConnector>("AssetService", &sections, &container, &dispatcher).unwrap();

    let request = json!({"route": "assets", "method": "delete", "data": {"id": Uuid::new_v4()}});
    assert!(matches!(
        dispatcher.dispatch(&request.to_string()).await,
        Err(DispatchError::Unauthorized(_))
    ));

    let mut authenticated = request.clone();
    authenticated["credentials"] = json!({"username": "grid", "password": "secret"});
    assert_eq!(
        dispatcher.dispatch(&authenticated.to_string()).await.unwrap(),
        json!({ "deleted": false })
    );

    assert!(matches!(
        initialize::<AssetServiceConnector>("AssetService", &sections, &container, &dispatcher),
        Err(ConnectorError::RouteInUse(_))
    ));
}
