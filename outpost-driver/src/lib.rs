//! Driver-side data model for the outpost routing runtime.
//!
//! A *driver* is a remote function-execution backend: field resolution, type
//! resolution, scalar coercion, authorization and subscriptions are all
//! delegated to it over one of the pluggable transports. This crate defines
//! the transport-independent pieces: the dynamic [`Value`] type every
//! transport marshals, the GraphQL metadata snapshots carried on each call,
//! the per-operation input/output structs, and the [`Driver`] / [`Handler`]
//! capability traits the transports implement and consume.

mod error;
mod ops;
pub mod types;
pub mod value;

pub use error::{BoxError, DecodeError, EncodeError, Error};
pub use ops::{
    AuthorizeInput, AuthorizeOutput, Config, Driver, FieldResolveInput, FieldResolveOutput,
    Function, Handler, InterfaceResolveTypeInput, InterfaceResolveTypeOutput, ResolveInfo,
    ScalarParseInput, ScalarParseOutput, ScalarSerializeInput, ScalarSerializeOutput, Secrets,
    SetSecretsInput, SetSecretsOutput, StreamInput, StreamOutput, SubscriptionConnectionInput,
    SubscriptionConnectionOutput, SubscriptionListenInput, SubscriptionListenOutput,
    SubscriptionReader, SubscriptionSender, UnionResolveTypeInput, UnionResolveTypeOutput,
    subscription_channel,
};
pub use value::Value;
