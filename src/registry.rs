//! Name-to-code resolution for quarantine types and spreads.
//!
//! The rule engine treats quarantine types and spreads as opaque numeric
//! codes. The registry owns the mapping from the symbolic names used in the
//! declarative rule source to those codes, standing in for the surrounding
//! system's constant tables. Resolution failures surface at rule-compilation
//! time, never during evaluation.

use std::collections::BTreeMap;

use crate::error::{CerebrumError, Result};
use crate::types::{QuarantineType, SpreadId};

/// Registry of symbolic constant names and their assigned codes.
#[derive(Debug, Clone, Default)]
pub struct ConstantRegistry {
    quarantine_types: BTreeMap<String, QuarantineType>,
    spreads: BTreeMap<String, SpreadId>,
}

impl ConstantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quarantine type under `name`. Re-registering a name
    /// replaces its code.
    pub fn register_quarantine_type<S: Into<String>>(
        &mut self,
        name: S,
        code: u32,
    ) -> QuarantineType {
        let qtype = QuarantineType(code);
        self.quarantine_types.insert(name.into(), qtype);
        qtype
    }

    /// Register a spread under `name`. Re-registering a name replaces its
    /// code.
    pub fn register_spread<S: Into<String>>(&mut self, name: S, code: u32) -> SpreadId {
        let spread = SpreadId(code);
        self.spreads.insert(name.into(), spread);
        spread
    }

    /// Resolve a quarantine-type name to its code.
    pub fn quarantine_type(&self, name: &str) -> Result<QuarantineType> {
        self.quarantine_types
            .get(name)
            .copied()
            .ok_or_else(|| CerebrumError::UnknownQuarantineType {
                name: name.to_string(),
            })
    }

    /// Resolve a spread name to its code.
    pub fn spread(&self, name: &str) -> Result<SpreadId> {
        self.spreads
            .get(name)
            .copied()
            .ok_or_else(|| CerebrumError::UnknownSpread {
                name: name.to_string(),
            })
    }

    /// Reverse lookup of a quarantine-type code, for diagnostics.
    #[must_use]
    pub fn quarantine_type_name(&self, qtype: QuarantineType) -> Option<&str> {
        self.quarantine_types
            .iter()
            .find_map(|(name, candidate)| (*candidate == qtype).then_some(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_names() {
        let mut registry = ConstantRegistry::new();
        let nologin = registry.register_quarantine_type("nologin", 1);
        let ad = registry.register_spread("AD_account", 10);

        assert_eq!(registry.quarantine_type("nologin").unwrap(), nologin);
        assert_eq!(registry.spread("AD_account").unwrap(), ad);
        assert_eq!(registry.quarantine_type_name(nologin), Some("nologin"));
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let registry = ConstantRegistry::new();
        assert!(matches!(
            registry.quarantine_type("missing"),
            Err(CerebrumError::UnknownQuarantineType { name }) if name == "missing"
        ));
        assert!(matches!(
            registry.spread("missing"),
            Err(CerebrumError::UnknownSpread { name }) if name == "missing"
        ));
    }

    #[test]
    fn re_registration_replaces_code() {
        let mut registry = ConstantRegistry::new();
        registry.register_quarantine_type("system", 2);
        let replaced = registry.register_quarantine_type("system", 7);
        assert_eq!(registry.quarantine_type("system").unwrap(), replaced);
        assert_eq!(replaced, QuarantineType(7));
    }
}
