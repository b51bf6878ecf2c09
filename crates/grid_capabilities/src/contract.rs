//! Contract identity.

use std::any::TypeId;
use std::fmt;

/// An abstract capability that several implementations can satisfy.
///
/// Implemented for trait-object types (`dyn AssetService`) through
/// [`declare_contract!`](crate::declare_contract). The implementing type is
/// what the container hands out behind an `Arc`.
pub trait Contract: Send + Sync + 'static {
    /// Display name used in logs and errors.
    const NAME: &'static str;
}

/// Identity of a contract: its `TypeId`, plus the display name for reporting.
#[derive(Debug, Clone, Copy)]
pub struct ContractId {
    type_id: TypeId,
    name: &'static str,
}

impl ContractId {
    /// Returns the identity of contract `C`.
    pub fn of<C: ?Sized + Contract>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Two contracts may share a display name; only the type decides identity.
impl PartialEq for ContractId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractId {}

impl std::hash::Hash for ContractId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Storage: Send + Sync {}
    trait Search: Send + Sync {}
    trait ShadowStorage: Send + Sync {}

    crate::declare_contract!(dyn Storage, "Storage");
    crate::declare_contract!(dyn Search, "Search");
    crate::declare_contract!(dyn ShadowStorage, "Storage");

    #[test]
    fn test_contract_identity_follows_type() {
        assert_eq!(ContractId::of::<dyn Storage>(), ContractId::of::<dyn Storage>());
        assert_ne!(ContractId::of::<dyn Storage>(), ContractId::of::<dyn Search>());
    }

    #[test]
    fn test_same_display_name_is_not_same_contract() {
        let storage = ContractId::of::<dyn Storage>();
        let shadow = ContractId::of::<dyn ShadowStorage>();
        assert_eq!(storage.name(), shadow.name());
        assert_ne!(storage, shadow);
    }

    #[test]
    fn test_display_uses_contract_name() {
        assert_eq!(ContractId::of::<dyn Search>().to_string(), "Search");
    }
}
