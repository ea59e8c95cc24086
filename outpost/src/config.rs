//! Typed router configuration.
//!
//! The configuration names deployment environments and binds schema elements
//! to driver functions. Resolvers are keyed `Type.field`; interfaces, unions
//! and scalars are keyed by type name. How the document gets here (file,
//! env, generated) is the embedding application's concern.

use std::collections::BTreeMap;

use outpost_driver::{Config, Secrets};
use serde::{Deserialize, Serialize};

use crate::error::RouterError;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RouterConfig {
    /// Named deployment environments drivers run in.
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
    /// Environment used by elements that name none. With exactly one
    /// environment configured this may be omitted.
    #[serde(default)]
    pub default_environment: Option<String>,
    /// Field resolvers, keyed `Type.field`.
    #[serde(default)]
    pub resolvers: BTreeMap<String, ResolverConfig>,
    /// Interface type resolvers, keyed by interface name.
    #[serde(default)]
    pub interfaces: BTreeMap<String, TypeResolverConfig>,
    /// Union type resolvers, keyed by union name.
    #[serde(default)]
    pub unions: BTreeMap<String, TypeResolverConfig>,
    /// Custom scalar coercion, keyed by scalar name.
    #[serde(default)]
    pub scalars: BTreeMap<String, ScalarConfig>,
    /// Secrets pushed to every driver before its first dispatch call.
    #[serde(default)]
    pub secrets: Secrets,
}

impl RouterConfig {
    /// Resolves an element's environment: the named one, the configured
    /// default, or the only one there is.
    pub fn environment(&self, name: Option<&str>) -> Result<&Environment, RouterError> {
        if let Some(name) = name.or(self.default_environment.as_deref()) {
            return self
                .environments
                .get(name)
                .ok_or_else(|| RouterError::UnknownEnvironment(name.to_string()));
        }
        if self.environments.len() == 1 {
            return Ok(self.environments.values().next().expect("len checked"));
        }
        Err(RouterError::NoDefaultEnvironment)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Environment {
    pub provider: String,
    pub runtime: String,
    /// Dial address for networked runtimes; plugin drivers have none.
    #[serde(default)]
    pub address: Option<String>,
}

impl Environment {
    /// The registry key this environment maps to.
    pub fn config(&self) -> Config {
        Config::new(&self.provider, &self.runtime)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FunctionConfig {
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ResolverConfig {
    pub resolve: FunctionConfig,
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TypeResolverConfig {
    pub resolve_type: FunctionConfig,
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ScalarConfig {
    pub parse: FunctionConfig,
    pub serialize: FunctionConfig,
    #[serde(default)]
    pub environment: Option<String>,
}
