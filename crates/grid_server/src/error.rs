use grid_connectors::ConnectorError;
use grid_modules::{DiscoveryError, HostScopeError};

/// Errors that stop the grid server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unknown service '{0}'")]
    UnknownService(String),
    #[error("Failed to publish host types: {0}")]
    HostScope(#[from] HostScopeError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("Connector [{service}] failed: {source}")]
    Connector {
        service: String,
        #[source]
        source: ConnectorError,
    },
}
