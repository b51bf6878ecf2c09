//! Request dispatch to attached connectors.
//!
//! Requests arrive as JSON:
//!
//! ```json
//! {
//!   "route": "assets",
//!   "method": "get",
//!   "data": { "id": "5e4a0c1e-3f69-4d2c-a61c-7f0b7e0e2a11" },
//!   "credentials": { "username": "grid", "password": "secret" }
//! }
//! ```

use crate::config::AuthMode;
use crate::error::ConnectorError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use grid_services::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serves the methods of one route.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, method: &str, data: Value) -> Result<Value, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub route: String,
    pub method: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("No connector attached to route '{0}'")]
    NoRoute(String),
    #[error("Unauthorized request for route '{0}'")]
    Unauthorized(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

struct Route {
    handler: Arc<dyn RequestHandler>,
    auth: AuthMode,
}

impl Route {
    fn admits(&self, credentials: Option<&Credentials>) -> bool {
        match &self.auth {
            AuthMode::None => true,
            AuthMode::Basic { username, password } => {
                credentials.is_some_and(|given| &given.username == username && &given.password == password)
            }
        }
    }
}

/// Routes requests to the connectors attached to it.
#[derive(Default)]
pub struct RequestDispatcher {
    routes: DashMap<String, Route>,
}

impl RequestDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `handler` to `route`. A route serves exactly one connector.
    pub fn attach(&self, route: &str, handler: Arc<dyn RequestHandler>, auth: AuthMode) -> Result<(), ConnectorError> {
        match self.routes.entry(route.to_string()) {
            Entry::Occupied(_) => Err(ConnectorError::RouteInUse(route.to_string())),
            Entry::Vacant(slot) => {
                let protected = auth != AuthMode::None;
                slot.insert(Route { handler, auth });
                info!("🔌 Attached connector to route '{}' (auth: {})", route, protected);
                Ok(())
            }
        }
    }

    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.routes.iter().map(|route| route.key().clone()).collect();
        routes.sort_unstable();
        routes
    }

    /// Parses a raw JSON request and dispatches it.
    pub async fn dispatch(&self, text: &str) -> Result<Value, DispatchError> {
        let request: ServiceRequest =
            serde_json::from_str(text).map_err(|e| DispatchError::InvalidRequest(format!("Invalid JSON: {e}")))?;
        self.dispatch_request(request).await
    }

    pub async fn dispatch_request(&self, request: ServiceRequest) -> Result<Value, DispatchError> {
        // Clone the handler out so no map guard is held across the await.
        let handler = {
            let route = self
                .routes
                .get(&request.route)
                .ok_or_else(|| DispatchError::NoRoute(request.route.clone()))?;
            if !route.admits(request.credentials.as_ref()) {
                warn!("Rejected unauthenticated request for route '{}'", request.route);
                return Err(DispatchError::Unauthorized(request.route));
            }
            route.handler.clone()
        };

        debug!("📨 Dispatching '{}' to route '{}'", request.method, request.route);
        Ok(handler.handle(&request.method, request.data).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl RequestHandler for Echo {
        async fn handle(&self, method: &str, data: Value) -> Result<Value, ServiceError> {
            match method {
                "echo" => Ok(data),
                other => Err(ServiceError::UnknownMethod(other.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_route() {
        let dispatcher = RequestDispatcher::new();
        dispatcher.attach("echo", Arc::new(Echo), AuthMode::None).unwrap();

        let reply = dispatcher
            .dispatch(r#"{"route": "echo", "method": "echo", "data": {"x": 1}}"#)
            .await
            .unwrap();
        assert_eq!(reply, json!({"x": 1}));

        assert!(matches!(
            dispatcher.dispatch(r#"{"route": "echo", "method": "shout"}"#).await,
            Err(DispatchError::Service(ServiceError::UnknownMethod(_)))
        ));
        assert!(matches!(
            dispatcher.dispatch(r#"{"route": "nowhere", "method": "echo"}"#).await,
            Err(DispatchError::NoRoute(_))
        ));
        assert!(matches!(
            dispatcher.dispatch("not json").await,
            Err(DispatchError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_basic_auth() {
        let dispatcher = RequestDispatcher::new();
        let auth = AuthMode::Basic {
            username: "grid".to_string(),
            password: "secret".to_string(),
        };
        dispatcher.attach("echo", Arc::new(Echo), auth).unwrap();

        let mut request = ServiceRequest {
            route: "echo".to_string(),
            method: "echo".to_string(),
            data: json!(true),
            credentials: None,
        };
        assert!(matches!(
            dispatcher.dispatch_request(request.clone()).await,
            Err(DispatchError::Unauthorized(_))
        ));

        request.credentials = Some(Credentials {
            username: "grid".to_string(),
            password: "wrong".to_string(),
        });
        assert!(dispatcher.dispatch_request(request.clone()).await.is_err());

        request.credentials = Some(Credentials {
            username: "grid".to_string(),
            password: "secret".to_string(),
        });
        assert_eq!(dispatcher.dispatch_request(request).await.unwrap(), json!(true));
    }

    #[test]
    fn test_route_attached_once() {
        let dispatcher = RequestDispatcher::new();
        dispatcher.attach("echo", Arc::new(Echo), AuthMode::None).unwrap();
        assert!(matches!(
            dispatcher.attach("echo", Arc::new(Echo), AuthMode::None),
            Err(ConnectorError::RouteInUse(_))
        ));
        assert_eq!(dispatcher.routes(), vec!["echo".to_string()]);
    }
}
