//! Type dispatch: map a host object's runtime type to the handler that
//! understands it.
//!
//! Handlers are registered against a host type name. Resolution walks the
//! type's base chain and picks the most derived registered ancestor, so a
//! handler for `Node` serves every node type that has no handler of its own.
//!
//! Collection containers are polymorphic (a `Nodes` collection does not derive
//! from anything useful), so they are matched by their own type name only.
//!
//! # Architecture
//!
//! - [`HandlerRegistry`]: type name → handler, with clobber detection
//! - [`HandledType`]: result of resolution, either a registered type or
//!   [`HandledType::Unhandled`]
//! - The export and import registries in [`crate::export`] and
//!   [`crate::import`] wrap a `HandlerRegistry` of their handler function type.

use std::fmt;

use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::host::Schema;

/// Outcome of resolving a runtime type against a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandledType {
    /// The most derived registered type the object is an instance of.
    Specific(String),
    /// No registered ancestor; only the generic walk applies.
    Unhandled,
}

impl HandledType {
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Specific(name) => Some(name),
            Self::Unhandled => None,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Specific(_))
    }
}

impl fmt::Display for HandledType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific(name) => f.write_str(name),
            Self::Unhandled => f.write_str("<unhandled>"),
        }
    }
}

/// Handlers keyed by the host type they assume, in registration order.
#[derive(Clone)]
pub struct HandlerRegistry<F> {
    handlers: IndexMap<String, F>,
}

impl<F> fmt::Debug for HandlerRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<F> Default for HandlerRegistry<F> {
    fn default() -> Self {
        Self {
            handlers: IndexMap::new(),
        }
    }
}

impl<F> HandlerRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `type_name`. Errors if one is already present.
    pub fn insert(&mut self, type_name: &str, handler: F) -> Result<(), RegistryError> {
        if type_name.is_empty() {
            return Err(RegistryError::MissingTypeParameter);
        }
        if self.handlers.contains_key(type_name) {
            return Err(RegistryError::Clobbering {
                type_name: type_name.to_string(),
            });
        }
        self.handlers.insert(type_name.to_string(), handler);
        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    pub fn get(&self, handled: &HandledType) -> Option<&F> {
        handled.type_name().and_then(|name| self.handlers.get(name))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered type names, in registration order.
    pub fn type_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Check every registered type against the host schema.
    pub fn validate(&self, schema: &Schema) -> Result<(), RegistryError> {
        match self.handlers.keys().find(|name| !schema.contains(name)) {
            Some(name) => Err(RegistryError::UnknownType {
                type_name: name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Resolve `type_name` to the most derived registered type.
    ///
    /// Non-collections walk the single-inheritance chain upwards; a type with
    /// several bases and no handler of its own is a registry error. Collection
    /// containers only match a handler registered under their exact name.
    pub fn resolve(
        &self,
        schema: &Schema,
        type_name: &str,
        is_collection: bool,
    ) -> Result<HandledType, RegistryError> {
        if is_collection {
            return Ok(if self.contains(type_name) {
                HandledType::Specific(type_name.to_string())
            } else {
                HandledType::Unhandled
            });
        }

        let mut current = type_name;
        loop {
            if self.contains(current) {
                return Ok(HandledType::Specific(current.to_string()));
            }
            let def = schema.get(current).ok_or_else(|| RegistryError::UnknownType {
                type_name: current.to_string(),
            })?;
            match def.bases.as_slice() {
                [] => return Ok(HandledType::Unhandled),
                [base] => current = base,
                bases => {
                    return Err(RegistryError::MultipleInheritance {
                        type_name: current.to_string(),
                        count: bases.len(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TypeDef;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.define(TypeDef::new("Node"));
        schema.define(TypeDef::new("MathNode").base("Node"));
        schema.define(TypeDef::new("GroupNode").base("Node"));
        schema.define(TypeDef::new("CustomGroup").base("GroupNode"));
        schema.define(TypeDef::new("Mixin"));
        schema.define(TypeDef::new("Hybrid").base("Node").base("Mixin"));
        schema.define(TypeDef::new("Orphan"));
        schema.define(TypeDef::collection("Nodes"));
        schema.define(TypeDef::collection("NodeLinks"));
        schema
    }

    fn registry() -> HandlerRegistry<&'static str> {
        let mut reg = HandlerRegistry::new();
        reg.insert("Node", "node").unwrap();
        reg.insert("GroupNode", "group").unwrap();
        reg.insert("Nodes", "nodes").unwrap();
        reg
    }

    #[test]
    fn resolves_most_derived_registered_ancestor() {
        let reg = registry();
        let schema = schema();
        assert_eq!(
            reg.resolve(&schema, "MathNode", false).unwrap(),
            HandledType::Specific("Node".into())
        );
        assert_eq!(
            reg.resolve(&schema, "CustomGroup", false).unwrap(),
            HandledType::Specific("GroupNode".into())
        );
    }

    #[test]
    fn unregistered_chain_is_unhandled() {
        let reg = registry();
        let handled = reg.resolve(&schema(), "Orphan", false).unwrap();
        assert_eq!(handled, HandledType::Unhandled);
        assert!(reg.get(&handled).is_none());
    }

    #[test]
    fn collections_match_by_exact_name() {
        let reg = registry();
        let schema = schema();
        assert_eq!(
            reg.resolve(&schema, "Nodes", true).unwrap(),
            HandledType::Specific("Nodes".into())
        );
        assert_eq!(
            reg.resolve(&schema, "NodeLinks", true).unwrap(),
            HandledType::Unhandled
        );
    }

    #[test]
    fn clobbering_is_rejected() {
        let mut reg = registry();
        let err = reg.insert("Node", "again").unwrap_err();
        assert!(matches!(err, RegistryError::Clobbering { .. }));
        assert!(matches!(
            reg.insert("", "nameless").unwrap_err(),
            RegistryError::MissingTypeParameter
        ));
    }

    #[test]
    fn multiple_inheritance_is_rejected() {
        let err = registry().resolve(&schema(), "Hybrid", false).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::MultipleInheritance { count: 2, .. }
        ));
    }

    #[test]
    fn validate_reports_unknown_types() {
        let mut reg = registry();
        assert!(reg.validate(&schema()).is_ok());
        reg.insert("Nonexistent", "ghost").unwrap();
        assert!(matches!(
            reg.validate(&schema()).unwrap_err(),
            RegistryError::UnknownType { .. }
        ));
    }
}
