//! The service connector pattern.

use crate::config::ConnectorSections;
use crate::dispatcher::{RequestDispatcher, RequestHandler};
use crate::error::ConnectorError;
use grid_capabilities::{CapabilityContainer, Contract};
use std::sync::Arc;
use tracing::{error, info};

/// A connector fronting one service contract.
pub trait ServiceConnector: RequestHandler + Sized + 'static {
    /// Contract whose implementation the connector serves
    type Contract: ?Sized + Contract;

    /// Dispatcher route the connector is attached to
    const ROUTE: &'static str;

    fn connect(service: Arc<Self::Contract>) -> Self;
}

/// Brings up connector `S` from configuration section `section_name`.
///
/// The section and its `implementation` key are checked before anything is
/// resolved. The implementation is then resolved by name from `container`;
/// resolution errors propagate unchanged and no default is ever substituted.
pub fn initialize<S: ServiceConnector>(
    section_name: &str,
    sections: &ConnectorSections,
    container: &CapabilityContainer,
    dispatcher: &RequestDispatcher,
) -> Result<Arc<S>, ConnectorError> {
    let result = connect::<S>(section_name, sections, container, dispatcher);
    match &result {
        Ok(_) => info!("✅ Connector [{}] serving route '{}'", section_name, S::ROUTE),
        Err(e) => error!("❌ Connector [{}] failed to initialize: {}", section_name, e),
    }
    result
}

fn connect<S: ServiceConnector>(
    section_name: &str,
    sections: &ConnectorSections,
    container: &CapabilityContainer,
    dispatcher: &RequestDispatcher,
) -> Result<Arc<S>, ConnectorError> {
    let section = sections.section(section_name)?;
    let implementation = section.implementation(section_name)?;
    let auth = section.auth_mode(section_name)?;

    let service = container.resolve_by_name::<S::Contract>(implementation)?;
    info!(
        "Connector [{}] using {} implementation '{}'",
        section_name,
        <S::Contract as Contract>::NAME,
        implementation
    );

    let connector = Arc::new(S::connect(service));
    dispatcher.attach(S::ROUTE, connector.clone(), auth)?;
    Ok(connector)
}
