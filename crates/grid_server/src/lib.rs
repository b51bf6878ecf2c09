//! Grid server host process.
//!
//! Publishes the shared framework types, loads region modules into isolated
//! contexts, and brings up the service connectors named in the
//! configuration.

pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod signals;

pub use config::{load_config, Args, Config};
pub use error::ServerError;
pub use server::{host_scope, static_modules, GridServer};
