//! Router build: configuration in, parser-ready resolver maps out.

use std::sync::Arc;

use outpost_driver::{Driver, Function};
use outpost_http::HttpDriver;
use outpost_proto::GrpcDriver;

use crate::config::{Environment, RouterConfig};
use crate::dispatch::Dispatch;
use crate::error::RouterError;
use crate::plugin;
use crate::registry::Registry;
use crate::schema::ParserConfig;

/// Builds the resolver maps for a configuration, instantiating and
/// registering a driver for every environment that does not already have
/// one. Every failure here — unreachable driver, unknown environment,
/// unregistered plugin — is a build-time error; nothing is deferred to the
/// first request.
pub async fn build(
    config: &RouterConfig,
    registry: Arc<Registry>,
) -> Result<ParserConfig, RouterError> {
    for (name, environment) in &config.environments {
        let key = environment.config();
        if registry.contains(&key) {
            continue;
        }
        let driver = connect(name, environment).await?;
        registry.register(key, driver);
    }

    let dispatch = Dispatch::new(registry, config.secrets.clone());
    let mut parser = ParserConfig::default();

    for (key, resolver) in &config.resolvers {
        let environment = config.environment(resolver.environment.as_deref())?;
        let resolve = dispatch
            .field_resolver(Function::new(&resolver.resolve.name), &environment.config())?;
        parser.resolvers.insert(key.clone(), resolve);
    }

    for (name, interface) in &config.interfaces {
        let environment = config.environment(interface.environment.as_deref())?;
        let resolve = dispatch.interface_resolver(
            Function::new(&interface.resolve_type.name),
            &environment.config(),
        )?;
        parser.resolve_types.insert(name.clone(), resolve);
    }

    for (name, union) in &config.unions {
        let environment = config.environment(union.environment.as_deref())?;
        let resolve = dispatch
            .union_resolver(Function::new(&union.resolve_type.name), &environment.config())?;
        parser.resolve_types.insert(name.clone(), resolve);
    }

    for (name, scalar) in &config.scalars {
        let environment = config.environment(scalar.environment.as_deref())?;
        let functions = dispatch.scalar_functions(
            Function::new(&scalar.parse.name),
            Function::new(&scalar.serialize.name),
            &environment.config(),
        )?;
        parser.scalars.insert(name.clone(), functions);
    }

    Ok(parser)
}

async fn connect(name: &str, environment: &Environment) -> Result<Arc<dyn Driver>, RouterError> {
    match environment.runtime.as_str() {
        "grpc" => {
            let address = environment
                .address
                .clone()
                .ok_or_else(|| RouterError::MissingAddress(name.to_string()))?;
            let driver = GrpcDriver::connect(address)
                .await
                .map_err(|err| RouterError::Transport(err.to_string()))?;
            Ok(Arc::new(driver))
        }
        "http" => {
            let address = environment
                .address
                .clone()
                .ok_or_else(|| RouterError::MissingAddress(name.to_string()))?;
            let driver = HttpDriver::new(address)
                .map_err(|err| RouterError::Transport(err.to_string()))?;
            Ok(Arc::new(driver))
        }
        "plugin" => plugin::plugin_driver(&environment.provider)
            .map(|driver| Arc::new(driver) as Arc<dyn Driver>)
            .ok_or_else(|| RouterError::UnknownPlugin(environment.provider.clone())),
        other => Err(RouterError::UnknownRuntime(other.to_string())),
    }
}
