//! Framework types and service contracts shared between the grid host and
//! the modules it loads.
//!
//! Everything here is provided by the host. Modules link against this crate
//! and declare the shared types they need, so values built inside a module
//! are the very same types the host and its connectors work with.

pub mod asset;

pub use asset::{AssetBase, AssetMetadata, AssetService, ServiceError};

/// Names under which the host publishes its shared framework types.
pub mod shared_types {
    pub const ASSET_BASE: &str = "AssetBase";
    pub const ASSET_METADATA: &str = "AssetMetadata";
}
