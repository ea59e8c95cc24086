//! A GraphQL routing runtime that delegates every field resolution, type
//! resolution and scalar coercion to out-of-process drivers.
//!
//! The router itself holds no resolver logic. A [`RouterConfig`] names the
//! deployment environments and binds schema elements (`Type.field` keys,
//! interface/union/scalar names) to driver functions; [`build`] turns that
//! into the resolver closures a GraphQL execution engine consumes, each one
//! dispatching through the abstract [`Driver`](outpost_driver::Driver)
//! capability surface. Three interchangeable transports implement it: gRPC
//! (`outpost-proto`), HTTP+Protobuf (`outpost-http`) and in-process plugin
//! drivers ([`plugin`]).

pub mod config;
pub mod dispatch;
mod error;
pub mod plugin;
pub mod registry;
pub mod schema;

mod router;

pub use config::{Environment, FunctionConfig, ResolverConfig, RouterConfig, ScalarConfig,
    TypeResolverConfig};
pub use dispatch::{
    Dispatch, FieldResolveFn, ResolveParams, ResolveTypeFn, ResolveTypeParams, ScalarFn,
    ScalarFunctions, ScalarParams, default_resolve_type, default_resolve_type_fn,
};
pub use error::{DispatchError, GraphqlError, ResolutionError, RouterError};
pub use plugin::{PluginDriver, plugin_driver, register_plugin_driver};
pub use registry::{DriverHandle, Registry};
pub use router::build;
pub use schema::{ParserConfig, SchemaTypes, resolve_type_with};

pub use outpost_driver::{self as driver, Value};
pub use outpost_http::HttpDriver;
pub use outpost_proto::GrpcDriver;
