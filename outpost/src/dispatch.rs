//! Binding schema elements to driver calls.
//!
//! Each configured resolver, interface, union and scalar becomes a closure
//! matching what the GraphQL execution engine expects. Driver lookup happens
//! when the closure is *built* — a missing driver fails the router build,
//! not the first request — and the router's secrets are pushed to each
//! driver before its first dispatch call.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql_value::Value as AstValue;
use futures::future::BoxFuture;
use outpost_driver::value::flatten;
use outpost_driver::{
    Config, FieldResolveInput, Function, InterfaceResolveTypeInput, ResolveInfo, ScalarParseInput,
    ScalarSerializeInput, Secrets, UnionResolveTypeInput, Value,
};

use crate::error::{DispatchError, ResolutionError, RouterError};
use crate::registry::{DriverHandle, Registry};

/// Raw execution parameters handed in by the engine adapter for one field.
/// Arguments and directives arrive as GraphQL AST literals and are flattened
/// here, immediately before dispatch.
#[derive(Debug, Default)]
pub struct ResolveParams {
    pub source: Value,
    pub arguments: BTreeMap<String, AstValue>,
    pub info: ResolveInfo,
    pub protocol: Value,
    pub subscription_payload: Value,
    /// Set while the engine runs its subscription-setup pass; real field
    /// resolution is skipped.
    pub blocking_subscription: bool,
}

/// Parameters for interface/union type resolution.
#[derive(Debug, Default)]
pub struct ResolveTypeParams {
    pub value: Value,
    pub info: ResolveInfo,
}

/// Parameters for scalar coercion.
#[derive(Debug, Default)]
pub struct ScalarParams {
    pub value: Value,
}

pub type FieldResolveFn =
    Arc<dyn Fn(ResolveParams) -> BoxFuture<'static, Result<Value, DispatchError>> + Send + Sync>;

/// Returns the resolved concrete type name, `None` for "no type" (the
/// ambiguity surfaces later as a GraphQL-level error), or a fatal
/// resolution error.
pub type ResolveTypeFn = Arc<
    dyn Fn(ResolveTypeParams) -> BoxFuture<'static, Result<Option<String>, ResolutionError>>
        + Send
        + Sync,
>;

pub type ScalarFn =
    Arc<dyn Fn(ScalarParams) -> BoxFuture<'static, Result<Value, ResolutionError>> + Send + Sync>;

/// Parse/serialize pair for one custom scalar.
#[derive(Clone)]
pub struct ScalarFunctions {
    pub parse: ScalarFn,
    pub serialize: ScalarFn,
}

/// Builds dispatch closures against a registry and a secret map.
#[derive(Clone)]
pub struct Dispatch {
    registry: Arc<Registry>,
    secrets: Secrets,
}

impl Dispatch {
    pub fn new(registry: Arc<Registry>, secrets: Secrets) -> Self {
        Self { registry, secrets }
    }

    fn handle(&self, environment: &Config) -> Result<DriverHandle, RouterError> {
        self.registry.get(environment)
    }

    /// Binds one field to a driver function.
    pub fn field_resolver(
        &self,
        function: Function,
        environment: &Config,
    ) -> Result<FieldResolveFn, RouterError> {
        let handle = self.handle(environment)?;
        let secrets = self.secrets.clone();
        Ok(Arc::new(move |params: ResolveParams| {
            let handle = handle.clone();
            let function = function.clone();
            let secrets = secrets.clone();
            Box::pin(async move {
                if params.blocking_subscription {
                    return Ok(Value::Null);
                }
                handle.ensure_secrets(&secrets).await?;
                let arguments = params
                    .arguments
                    .into_iter()
                    .map(|(name, value)| (name, flatten(value)))
                    .collect();
                let output = handle
                    .driver()
                    .field_resolve(FieldResolveInput {
                        function: function.clone(),
                        source: params.source,
                        arguments,
                        info: params.info,
                        protocol: params.protocol,
                        subscription_payload: params.subscription_payload,
                    })
                    .await;
                match output.error {
                    Some(error) => Err(DispatchError::Call {
                        function: function.name,
                        message: error.message,
                    }),
                    None => Ok(output.response),
                }
            })
        }))
    }

    /// Binds an interface's type resolution to a driver function.
    pub fn interface_resolver(
        &self,
        function: Function,
        environment: &Config,
    ) -> Result<ResolveTypeFn, RouterError> {
        let handle = self.handle(environment)?;
        let secrets = self.secrets.clone();
        Ok(Arc::new(move |params: ResolveTypeParams| {
            let handle = handle.clone();
            let function = function.clone();
            let secrets = secrets.clone();
            Box::pin(async move {
                handle
                    .ensure_secrets(&secrets)
                    .await
                    .map_err(ResolutionError::Dispatch)?;
                let output = handle
                    .driver()
                    .interface_resolve_type(InterfaceResolveTypeInput {
                        function: function.clone(),
                        value: params.value,
                        info: params.info,
                    })
                    .await;
                if let Some(error) = output.error {
                    return Err(ResolutionError::Dispatch(DispatchError::Call {
                        function: function.name,
                        message: error.message,
                    }));
                }
                match output.type_ref {
                    Some(type_ref) => Ok(Some(type_ref.name().to_string())),
                    None => Err(ResolutionError::MissingType),
                }
            })
        }))
    }

    /// Binds a union's type resolution to a driver function.
    pub fn union_resolver(
        &self,
        function: Function,
        environment: &Config,
    ) -> Result<ResolveTypeFn, RouterError> {
        let handle = self.handle(environment)?;
        let secrets = self.secrets.clone();
        Ok(Arc::new(move |params: ResolveTypeParams| {
            let handle = handle.clone();
            let function = function.clone();
            let secrets = secrets.clone();
            Box::pin(async move {
                handle
                    .ensure_secrets(&secrets)
                    .await
                    .map_err(ResolutionError::Dispatch)?;
                let output = handle
                    .driver()
                    .union_resolve_type(UnionResolveTypeInput {
                        function: function.clone(),
                        value: params.value,
                        info: params.info,
                    })
                    .await;
                if let Some(error) = output.error {
                    return Err(ResolutionError::Dispatch(DispatchError::Call {
                        function: function.name,
                        message: error.message,
                    }));
                }
                match output.type_ref {
                    Some(type_ref) => Ok(Some(type_ref.name().to_string())),
                    None => Err(ResolutionError::MissingType),
                }
            })
        }))
    }

    /// Binds a custom scalar's coercion to a pair of driver functions.
    pub fn scalar_functions(
        &self,
        parse: Function,
        serialize: Function,
        environment: &Config,
    ) -> Result<ScalarFunctions, RouterError> {
        let handle = self.handle(environment)?;

        let parse_fn: ScalarFn = {
            let handle = handle.clone();
            let secrets = self.secrets.clone();
            Arc::new(move |params: ScalarParams| {
                let handle = handle.clone();
                let function = parse.clone();
                let secrets = secrets.clone();
                Box::pin(async move {
                    handle
                        .ensure_secrets(&secrets)
                        .await
                        .map_err(ResolutionError::Dispatch)?;
                    let output = handle
                        .driver()
                        .scalar_parse(ScalarParseInput {
                            function: function.clone(),
                            value: params.value,
                        })
                        .await;
                    match output.error {
                        Some(error) => Err(ResolutionError::Dispatch(DispatchError::Call {
                            function: function.name,
                            message: error.message,
                        })),
                        None => Ok(output.response),
                    }
                })
            })
        };

        let serialize_fn: ScalarFn = {
            let secrets = self.secrets.clone();
            Arc::new(move |params: ScalarParams| {
                let handle = handle.clone();
                let function = serialize.clone();
                let secrets = secrets.clone();
                Box::pin(async move {
                    handle
                        .ensure_secrets(&secrets)
                        .await
                        .map_err(ResolutionError::Dispatch)?;
                    let output = handle
                        .driver()
                        .scalar_serialize(ScalarSerializeInput {
                            function: function.clone(),
                            value: params.value,
                        })
                        .await;
                    match output.error {
                        Some(error) => Err(ResolutionError::Dispatch(DispatchError::Call {
                            function: function.name,
                            message: error.message,
                        })),
                        None => Ok(output.response),
                    }
                })
            })
        };

        Ok(ScalarFunctions {
            parse: parse_fn,
            serialize: serialize_fn,
        })
    }
}

/// Convention-based type resolution used when no resolver is configured:
/// a single possible type wins unconditionally; otherwise the resolved
/// value's `__typename` key is matched against the possible types. No match
/// resolves to no type rather than an error.
pub fn default_resolve_type(value: &Value, possible_types: &[String]) -> Option<String> {
    if possible_types.len() == 1 {
        return Some(possible_types[0].clone());
    }
    let name = value.get("__typename")?.as_str()?;
    possible_types.iter().find(|t| t.as_str() == name).cloned()
}

/// Wraps the default convention in the resolver function shape.
pub fn default_resolve_type_fn(possible_types: Vec<String>) -> ResolveTypeFn {
    Arc::new(move |params: ResolveTypeParams| {
        let possible_types = possible_types.clone();
        Box::pin(async move { Ok(default_resolve_type(&params.value, &possible_types)) })
    })
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    use super::*;

    fn possible() -> Vec<String> {
        vec![
            "Human".to_string(),
            "Droid".to_string(),
            "Starship".to_string(),
        ]
    }

    #[test]
    fn default_resolution_matches_typename() {
        let value = Value::Object(btreemap! {
            "__typename".to_string() => Value::from("Droid"),
        });
        assert_eq!(
            default_resolve_type(&value, &possible()),
            Some("Droid".to_string())
        );
    }

    #[test]
    fn default_resolution_without_typename_returns_no_type() {
        let value = Value::Object(btreemap! {
            "name".to_string() => Value::from("R2-D2"),
        });
        assert_eq!(default_resolve_type(&value, &possible()), None);
        assert_eq!(default_resolve_type(&Value::Int(42), &possible()), None);
        // An unknown __typename is also "no type", not an error.
        let value = Value::Object(btreemap! {
            "__typename".to_string() => Value::from("Wookiee"),
        });
        assert_eq!(default_resolve_type(&value, &possible()), None);
    }

    #[test]
    fn a_single_possible_type_wins_unconditionally() {
        assert_eq!(
            default_resolve_type(&Value::Null, &["Droid".to_string()]),
            Some("Droid".to_string())
        );
    }
}
