//! # Grid Capabilities
//!
//! Named-implementation registry for the grid server. Any number of
//! implementations of the same service contract can be registered, each under
//! its own name, and consumers pick one by name at configuration time.
//!
//! ## Key Concepts
//!
//! - **Contract**: an abstract capability, expressed as a trait-object type
//!   such as `dyn AssetService`, tagged with a display name through
//!   [`declare_contract!`].
//! - **Named Binding**: one implementation factory registered for a contract
//!   under a unique name, with a [`Lifetime`].
//! - **CapabilityContainer**: the registry itself. It is constructed once by
//!   the host and handed to every consumer explicitly; there is no global
//!   instance.
//!
//! ## Example
//!
//! ```rust
//! use grid_capabilities::{declare_contract, CapabilityContainer, Lifetime};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//! declare_contract!(dyn Greeter, "Greeter");
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".to_string() }
//! }
//!
//! let container = CapabilityContainer::new();
//! container
//!     .register::<dyn Greeter, _>("english", Lifetime::Singleton, || {
//!         Ok(Arc::new(English) as Arc<dyn Greeter>)
//!     })
//!     .unwrap();
//!
//! let greeter = container.resolve_by_name::<dyn Greeter>("english").unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

pub mod binding;
pub mod container;
pub mod contract;
pub mod error;

pub use binding::{BindingInfo, Lifetime};
pub use container::CapabilityContainer;
pub use contract::{Contract, ContractId};
pub use error::{ConstructionError, ContainerError};

/// Marks a trait-object type as a contract with the given display name.
///
/// The name shows up in every error that mentions the contract, so it
/// should be the name operators know the service by.
#[macro_export]
macro_rules! declare_contract {
    ($contract:ty, $name:expr) => {
        impl $crate::Contract for $contract {
            const NAME: &'static str = $name;
        }
    };
}
