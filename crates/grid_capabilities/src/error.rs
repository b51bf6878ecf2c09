//! Error types for the capability container.

/// Errors raised by registration and resolution.
///
/// Naming errors are operator or packaging mistakes: they are reported with
/// the contract and name involved and are never recovered from locally.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// A second registration used a name already bound for the contract
    #[error("Duplicate binding: {contract} already has an implementation named '{name}'")]
    DuplicateName { contract: &'static str, name: String },
    /// No implementation of the contract is bound under the name
    #[error("Unresolved binding: no implementation of {contract} named '{name}'")]
    UnresolvedName { contract: &'static str, name: String },
    /// Binding names must be non-empty
    #[error("Invalid binding name for {contract}: names must not be empty")]
    InvalidName { contract: &'static str },
    /// The implementation factory failed; nothing was cached
    #[error("Failed to construct {contract} implementation '{name}': {source}")]
    ConstructionFailed {
        contract: &'static str,
        name: String,
        #[source]
        source: ConstructionError,
    },
    /// The stored instance was not of the requested contract type
    #[error("Binding '{name}' does not hold a {contract} instance")]
    ContractMismatch { contract: &'static str, name: String },
}

/// Failure reported by an implementation factory.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct ConstructionError {
    reason: String,
}

impl ConstructionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
