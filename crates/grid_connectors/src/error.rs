use grid_capabilities::ContainerError;

/// Errors raised while bringing a connector up.
///
/// All of them are startup-fatal for the connector concerned.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Missing configuration in section [{section}]{}", .key.map(|key| format!(": key '{key}'")).unwrap_or_default())]
    MissingConfiguration { section: String, key: Option<&'static str> },
    #[error("Invalid configuration in section [{section}]: {reason}")]
    InvalidConfiguration { section: String, reason: String },
    #[error(transparent)]
    Resolution(#[from] ContainerError),
    #[error("Route '{0}' already has a connector attached")]
    RouteInUse(String),
}
