//! The seam to the GraphQL schema parser/execution engine.
//!
//! The parser consumes maps of resolver closures keyed by schema element;
//! after interface/union resolution it needs to turn the returned type name
//! back into one of its own type objects, which is what [`SchemaTypes`] and
//! [`resolve_type_with`] are for. That function is also the single recovery
//! boundary: a fatal resolution error becomes a per-field [`GraphqlError`]
//! without touching sibling fields.

use std::collections::HashMap;

use crate::dispatch::{FieldResolveFn, ResolveTypeFn, ResolveTypeParams, ScalarFunctions};
use crate::error::{GraphqlError, ResolutionError};

/// Everything the schema parser needs from the router: resolver closures
/// keyed by `Type.field`, type resolvers keyed by type name, and scalar
/// coercion keyed by scalar name.
#[derive(Clone, Default)]
pub struct ParserConfig {
    pub resolvers: HashMap<String, FieldResolveFn>,
    pub resolve_types: HashMap<String, ResolveTypeFn>,
    pub scalars: HashMap<String, ScalarFunctions>,
}

impl std::fmt::Debug for ParserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The stored values are resolver closures, which are not `Debug`;
        // surface the registered keys instead.
        f.debug_struct("ParserConfig")
            .field("resolvers", &self.resolvers.keys())
            .field("resolve_types", &self.resolve_types.keys())
            .field("scalars", &self.scalars.keys())
            .finish()
    }
}

/// A schema object exposing type lookup by name.
pub trait SchemaTypes {
    type Type;

    fn type_by_name(&self, name: &str) -> Option<Self::Type>;
}

/// Runs a type resolver and maps its result into the engine's type object.
///
/// Resolution failures and names missing from the schema become GraphQL
/// errors here; "no type" passes through as `None` and surfaces later as
/// the engine's own ambiguous-type error.
pub async fn resolve_type_with<S: SchemaTypes>(
    resolver: &ResolveTypeFn,
    params: ResolveTypeParams,
    schema: &S,
) -> Result<Option<S::Type>, GraphqlError> {
    match resolver(params).await {
        Ok(Some(name)) => match schema.type_by_name(&name) {
            Some(ty) => Ok(Some(ty)),
            None => Err(GraphqlError::from(ResolutionError::UnknownType(name))),
        },
        Ok(None) => Ok(None),
        Err(err) => Err(GraphqlError::from(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use maplit::btreemap;
    use outpost_driver::Value;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dispatch::default_resolve_type_fn;

    struct FakeSchema {
        types: HashMap<String, &'static str>,
    }

    impl SchemaTypes for FakeSchema {
        type Type = &'static str;

        fn type_by_name(&self, name: &str) -> Option<&'static str> {
            self.types.get(name).copied()
        }
    }

    fn schema() -> FakeSchema {
        FakeSchema {
            types: HashMap::from([("Droid".to_string(), "droid-type")]),
        }
    }

    #[tokio::test]
    async fn resolved_names_become_schema_types() {
        let resolver = default_resolve_type_fn(vec!["Human".to_string(), "Droid".to_string()]);
        let params = ResolveTypeParams {
            value: Value::Object(btreemap! {
                "__typename".to_string() => Value::from("Droid"),
            }),
            ..Default::default()
        };
        let resolved = resolve_type_with(&resolver, params, &schema()).await.unwrap();
        assert_eq!(resolved, Some("droid-type"));
    }

    #[tokio::test]
    async fn unknown_names_are_graphql_errors() {
        let resolver = default_resolve_type_fn(vec!["Human".to_string(), "Wookiee".to_string()]);
        let params = ResolveTypeParams {
            value: Value::Object(btreemap! {
                "__typename".to_string() => Value::from("Wookiee"),
            }),
            ..Default::default()
        };
        let err = resolve_type_with(&resolver, params, &schema())
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "resolved type 'Wookiee' is not present in the schema"
        );
    }

    #[tokio::test]
    async fn no_type_passes_through() {
        let resolver = default_resolve_type_fn(vec!["Human".to_string(), "Droid".to_string()]);
        let params = ResolveTypeParams {
            value: Value::from("scalar-ish"),
            ..Default::default()
        };
        let resolved = resolve_type_with(&resolver, params, &schema()).await.unwrap();
        assert_eq!(resolved, None);
    }
}
