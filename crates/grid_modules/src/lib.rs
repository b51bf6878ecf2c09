//! Module loading for the grid server.
//!
//! Implementation code reaches the process as *modules*. Each module is
//! loaded into its own [`LoadContext`], an isolated scope that can later be
//! unloaded, and then self-registers its named implementations into the
//! shared [`CapabilityContainer`](grid_capabilities::CapabilityContainer).
//!
//! ## Components
//!
//! - [`HostScope`]: framework types the host provides to every module. Type
//!   lookups a context cannot satisfy itself are deferred here, so a shared
//!   type is never duplicated across contexts.
//! - [`LoadContext`]: isolated, explicitly unloadable scope owning loaded
//!   modules. [`LibraryLoadContext`] loads shared libraries;
//!   [`StaticLoadContext`] resolves modules from a table of modules linked
//!   into the binary.
//! - [`LoadContextFactory`]: hands out fresh contexts so the loader never
//!   depends on a concrete context type.
//! - [`ModuleLoader`]: loads one module per context, runs its registration
//!   and reports the outcome through `tracing`.
//!
//! ## Writing a module
//!
//! ```rust,ignore
//! use grid_modules::{declare_grid_module, ModuleDeclaration, SharedType, MODULE_ABI_VERSION};
//!
//! pub const DECLARATION: ModuleDeclaration = ModuleDeclaration {
//!     abi_version: MODULE_ABI_VERSION,
//!     name: "module_weather",
//!     version: env!("CARGO_PKG_VERSION"),
//!     requires: &[
//!         || SharedType::of::<AssetBase>("AssetBase"),
//!         SharedType::contract::<dyn RegionModule>,
//!     ],
//!     exports: &[],
//!     register,
//! };
//!
//! fn register(container: &CapabilityContainer) -> Result<(), ContainerError> {
//!     // container.register::<dyn RegionModule, _>("Weather", ...)
//!     Ok(())
//! }
//!
//! declare_grid_module!(DECLARATION);
//! ```

pub mod context;
pub mod declaration;
pub mod error;
pub mod factory;
pub mod host;
pub mod library;
pub mod loader;
pub mod static_table;

pub use context::{ContextId, LoadContext, LoadedModule, UnloadReport};
pub use declaration::{
    ModuleDeclaration, RegisterFn, SharedTypeFn, ABI_VERSION_SYMBOL, DECLARATION_SYMBOL, MODULE_ABI_VERSION,
};
pub use error::{DiscoveryError, HostScopeError, LoadCause, LoadFailure};
pub use factory::{LibraryContextFactory, LoadContextFactory, StaticContextFactory};
pub use host::{HostScope, SharedType, TypeOrigin};
pub use library::LibraryLoadContext;
pub use loader::{LoadOptions, ModuleLoader, ModuleRecord};
pub use static_table::{StaticLoadContext, StaticModuleTable};
