//! Load context factories.

use crate::context::LoadContext;
use crate::host::HostScope;
use crate::library::LibraryLoadContext;
use crate::static_table::{StaticLoadContext, StaticModuleTable};
use std::sync::Arc;

/// Produces fresh load contexts.
///
/// Every call must return a new, independent context: unloading one module's
/// context can never affect another module.
pub trait LoadContextFactory: Send + Sync {
    fn create_load_context(&self) -> Arc<dyn LoadContext>;

    /// File extensions the produced contexts know how to load.
    fn module_extensions(&self) -> &[&'static str];
}

const LIBRARY_EXTENSIONS: &[&str] = &["so", "dll", "dylib"];
const STATIC_EXTENSIONS: &[&str] = &["module", "so", "dll", "dylib"];

/// Creates [`LibraryLoadContext`]s.
pub struct LibraryContextFactory {
    host: Arc<HostScope>,
}

impl LibraryContextFactory {
    pub fn new(host: Arc<HostScope>) -> Self {
        Self { host }
    }
}

impl LoadContextFactory for LibraryContextFactory {
    fn create_load_context(&self) -> Arc<dyn LoadContext> {
        Arc::new(LibraryLoadContext::new(self.host.clone()))
    }

    fn module_extensions(&self) -> &[&'static str] {
        LIBRARY_EXTENSIONS
    }
}

/// Creates [`StaticLoadContext`]s over a shared module table.
pub struct StaticContextFactory {
    host: Arc<HostScope>,
    table: Arc<StaticModuleTable>,
}

impl StaticContextFactory {
    pub fn new(host: Arc<HostScope>, table: StaticModuleTable) -> Self {
        Self {
            host,
            table: Arc::new(table),
        }
    }
}

impl LoadContextFactory for StaticContextFactory {
    fn create_load_context(&self) -> Arc<dyn LoadContext> {
        Arc::new(StaticLoadContext::new(self.host.clone(), self.table.clone()))
    }

    fn module_extensions(&self) -> &[&'static str] {
        STATIC_EXTENSIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_context_is_independent() {
        let factory = StaticContextFactory::new(Arc::new(HostScope::new()), StaticModuleTable::new());
        let first = factory.create_load_context();
        let second = factory.create_load_context();

        assert_ne!(first.id(), second.id());
        first.unload();
        assert!(first.is_unloaded());
        assert!(!second.is_unloaded());
        assert!(second.is_collectible());
    }

    #[test]
    fn test_extensions() {
        let host = Arc::new(HostScope::new());
        assert!(!LibraryContextFactory::new(host.clone()).module_extensions().contains(&"module"));
        assert!(StaticContextFactory::new(host, StaticModuleTable::new())
            .module_extensions()
            .contains(&"module"));
    }
}
