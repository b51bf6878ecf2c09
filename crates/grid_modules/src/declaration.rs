//! What a module tells the host about itself.

use crate::host::SharedType;
use grid_capabilities::{CapabilityContainer, ContainerError};
use std::fmt;

/// Version of the module entry-point ABI. Bumped whenever
/// [`ModuleDeclaration`] changes shape.
pub const MODULE_ABI_VERSION: u32 = 2;

/// Exported by every module library: `extern "C" fn() -> u32`.
pub const ABI_VERSION_SYMBOL: &[u8] = b"grid_module_abi_version\0";

/// Exported by every module library: `extern "C" fn() -> *const ModuleDeclaration`.
pub const DECLARATION_SYMBOL: &[u8] = b"grid_module_declaration\0";

/// Entry point through which a module registers its named implementations.
pub type RegisterFn = fn(&CapabilityContainer) -> Result<(), ContainerError>;

/// Describes one shared type as the module's own build sees it.
///
/// Runs inside the module, so the descriptor carries the module's `TypeId`
/// for the type rather than the host's.
pub type SharedTypeFn = fn() -> SharedType;

/// Static description of a module.
///
/// Modules usually define it as a `const` and hand it to
/// [`declare_grid_module!`](crate::declare_grid_module) for dynamic loading,
/// or to a [`StaticModuleTable`](crate::StaticModuleTable) when linked into
/// the host.
#[derive(Clone, Copy)]
pub struct ModuleDeclaration {
    pub abi_version: u32,
    pub name: &'static str,
    pub version: &'static str,
    /// Shared types and contracts the module uses. Each must resolve, by
    /// name, to the identical type before the module is admitted. List
    /// every contract the module registers implementations of.
    pub requires: &'static [SharedTypeFn],
    /// Types this module offers to other modules in its context
    pub exports: &'static [SharedTypeFn],
    pub register: RegisterFn,
}

impl fmt::Debug for ModuleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDeclaration")
            .field("abi_version", &self.abi_version)
            .field("name", &self.name)
            .field("version", &self.version)
            .field(
                "requires",
                &self.requires.iter().map(|describe| describe().name().to_string()).collect::<Vec<_>>(),
            )
            .field("exports", &self.exports.len())
            .finish()
    }
}

/// Generates the entry points the library loader looks for.
///
/// Only one module per shared library: the symbols are unmangled.
#[macro_export]
macro_rules! declare_grid_module {
    ($declaration:expr) => {
        #[no_mangle]
        pub extern "C" fn grid_module_abi_version() -> u32 {
            $crate::MODULE_ABI_VERSION
        }

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn grid_module_declaration() -> *const $crate::ModuleDeclaration {
            static GRID_MODULE_DECLARATION: $crate::ModuleDeclaration = $declaration;
            &GRID_MODULE_DECLARATION
        }
    };
}
