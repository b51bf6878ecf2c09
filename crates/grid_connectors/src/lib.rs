//! Service connectors.
//!
//! A connector is the thin front of a grid service: it reads its
//! configuration section, resolves the implementation named there from the
//! [`CapabilityContainer`](grid_capabilities::CapabilityContainer) and
//! exposes it on a [`RequestDispatcher`] route. Connectors never construct
//! implementations themselves.
//!
//! ```toml
//! [connectors.AssetService]
//! implementation = "MemoryAssetService"
//! auth_type = "BasicHttpAuthentication"
//! http_auth_username = "grid"
//! http_auth_password = "secret"
//! ```

pub mod asset;
pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;

pub use asset::AssetServiceConnector;
pub use config::{AuthMode, ConnectorSection, ConnectorSections};
pub use connector::{initialize, ServiceConnector};
pub use dispatcher::{Credentials, DispatchError, RequestDispatcher, RequestHandler, ServiceRequest};
pub use error::ConnectorError;
