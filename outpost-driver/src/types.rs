//! GraphQL metadata carried on driver calls.
//!
//! These types snapshot the execution context of a single dispatch call:
//! where in the response tree the value lands, what the surrounding
//! operation looks like, and which types are involved. They are mirrored
//! 1:1 by wire messages and are never mutated after construction.
//!
//! Fragment spreads are expanded eagerly when a [`Selection`] is built, so
//! no fragment *name* ever crosses the wire, only expanded definitions.
//! Cyclic spreads are a caller bug, not something handled here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Named arguments attached to a field or directive, flattened from the
/// GraphQL AST. Values may contain [`Value::Variable`] placeholders.
pub type Arguments = BTreeMap<String, Value>;

/// A (possibly wrapped) reference to a schema type.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn non_null(self) -> Self {
        TypeRef::NonNull(Box::new(self))
    }

    pub fn list(self) -> Self {
        TypeRef::List(Box::new(self))
    }

    /// The innermost named type, unwrapping non-null and list modifiers.
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::NonNull(inner) | TypeRef::List(inner) => inner.name(),
        }
    }
}

/// A segment chain identifying a value's position in the response tree,
/// innermost segment first. Segments are field names or list indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponsePath {
    pub key: Value,
    pub prev: Option<Box<ResponsePath>>,
}

impl ResponsePath {
    pub fn new(key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            prev: None,
        }
    }

    pub fn child(self, key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            prev: Some(Box::new(self)),
        }
    }
}

/// A directive applied at a usage site, arguments already flattened.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

/// A variable declared by an operation, with its flattened default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub variable: String,
    #[serde(default)]
    pub default_value: Option<Value>,
}

/// One entry of a selection set: either a field, or a fragment expanded at
/// construction time (inline fragments and named spreads look identical
/// once expanded).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    Field {
        name: String,
        #[serde(default)]
        arguments: Arguments,
        #[serde(default)]
        directives: Vec<Directive>,
        #[serde(default)]
        selection_set: Vec<Selection>,
    },
    Fragment(FragmentDefinition),
}

/// An expanded fragment carried inline in a selection set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: Option<TypeRef>,
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub variable_definitions: Vec<VariableDefinition>,
    #[serde(default)]
    pub selection_set: Vec<Selection>,
}

/// The operation a dispatch call belongs to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// `query`, `mutation` or `subscription`.
    pub operation: String,
    pub name: Option<String>,
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub variable_definitions: Vec<VariableDefinition>,
    #[serde(default)]
    pub selection_set: Vec<Selection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ref_unwraps_to_innermost_name() {
        let t = TypeRef::named("Droid").non_null().list().non_null();
        assert_eq!(t.name(), "Droid");
    }

    #[test]
    fn response_path_chains_inner_first() {
        let path = ResponsePath::new("hero").child(0i64).child("name");
        assert_eq!(path.key, Value::from("name"));
        let prev = path.prev.as_deref().unwrap();
        assert_eq!(prev.key, Value::Int(0));
        assert_eq!(prev.prev.as_deref().unwrap().key, Value::from("hero"));
    }
}
