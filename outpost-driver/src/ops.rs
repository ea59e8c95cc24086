//! Driver operations: per-call inputs/outputs and the capability traits.
//!
//! Every operation output carries an optional [`Error`]; transports fold
//! network failures, protocol violations and handler errors into that one
//! field so dispatch has a single failure check per call.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, Error};
use crate::types::{Arguments, OperationDefinition, ResponsePath, TypeRef};
use crate::value::Value;

/// Identifies a remote handler by name within its driver.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Function {
    pub name: String,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The `(provider, runtime)` pair identifying a deployment environment;
/// used as the driver registry key.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub provider: String,
    pub runtime: String,
}

impl Config {
    pub fn new(provider: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            runtime: runtime.into(),
        }
    }
}

/// Secrets pushed to a driver once before its first dispatch call; a driver
/// is free to cache them for its process lifetime.
pub type Secrets = BTreeMap<String, String>;

/// Execution-context snapshot carried on resolution calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolveInfo {
    pub field_name: String,
    pub path: Option<ResponsePath>,
    pub return_type: Option<TypeRef>,
    pub parent_type: Option<TypeRef>,
    pub operation: Option<OperationDefinition>,
    pub variable_values: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldResolveInput {
    pub function: Function,
    pub source: Value,
    pub arguments: Arguments,
    pub info: ResolveInfo,
    /// Transport-specific request context handed through verbatim.
    pub protocol: Value,
    /// Event payload when the resolution happens inside a subscription push.
    pub subscription_payload: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldResolveOutput {
    pub response: Value,
    pub error: Option<Error>,
}

impl FieldResolveOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            response: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceResolveTypeInput {
    pub function: Function,
    pub value: Value,
    pub info: ResolveInfo,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceResolveTypeOutput {
    pub type_ref: Option<TypeRef>,
    pub error: Option<Error>,
}

impl InterfaceResolveTypeOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            type_ref: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnionResolveTypeInput {
    pub function: Function,
    pub value: Value,
    pub info: ResolveInfo,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnionResolveTypeOutput {
    pub type_ref: Option<TypeRef>,
    pub error: Option<Error>,
}

impl UnionResolveTypeOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            type_ref: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalarParseInput {
    pub function: Function,
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalarParseOutput {
    pub response: Value,
    pub error: Option<Error>,
}

impl ScalarParseOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            response: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalarSerializeInput {
    pub function: Function,
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScalarSerializeOutput {
    pub response: Value,
    pub error: Option<Error>,
}

impl ScalarSerializeOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            response: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetSecretsInput {
    pub secrets: Secrets,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetSecretsOutput {
    pub error: Option<Error>,
}

impl SetSecretsOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorizeInput {
    pub function: Function,
    pub query: String,
    pub operation_name: Option<String>,
    pub variable_values: BTreeMap<String, Value>,
    pub protocol: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorizeOutput {
    pub response: bool,
    pub error: Option<Error>,
}

impl AuthorizeOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            response: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscriptionConnectionInput {
    pub function: Function,
    pub query: String,
    pub operation_name: Option<String>,
    pub variable_values: BTreeMap<String, Value>,
    pub protocol: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscriptionConnectionOutput {
    pub response: Value,
    pub error: Option<Error>,
}

impl SubscriptionConnectionOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            response: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubscriptionListenInput {
    pub function: Function,
    pub query: String,
    pub operation_name: Option<String>,
    pub variable_values: BTreeMap<String, Value>,
    pub protocol: Value,
    pub operation: Option<OperationDefinition>,
}

#[derive(Debug, Default)]
pub struct SubscriptionListenOutput {
    pub reader: Option<SubscriptionReader>,
    pub error: Option<Error>,
}

impl SubscriptionListenOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            reader: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamInput {
    pub function: Function,
    pub arguments: Arguments,
    pub info: ResolveInfo,
}

#[derive(Debug, Default)]
pub struct StreamOutput {
    pub reader: Option<SubscriptionReader>,
    pub error: Option<Error>,
}

impl StreamOutput {
    pub fn from_error(error: impl Into<Error>) -> Self {
        Self {
            reader: None,
            error: Some(error.into()),
        }
    }
}

/// Consumer side of a server-streamed value feed.
///
/// Messages arrive in wire order through a bounded channel. [`close`] cancels
/// the producer; a termination *caused by* that cancellation is a clean
/// shutdown and is not reported through [`error`].
///
/// [`close`]: SubscriptionReader::close
/// [`error`]: SubscriptionReader::error
#[derive(Debug)]
pub struct SubscriptionReader {
    rx: mpsc::Receiver<Value>,
    cancel: CancellationToken,
    error: Arc<Mutex<Option<Error>>>,
}

impl SubscriptionReader {
    /// Receives the next message, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Cancels the underlying stream. Buffered messages are still delivered,
    /// then [`next`](SubscriptionReader::next) returns `None`.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// The terminal error, if the stream ended abnormally. `None` after a
    /// clean end or a [`close`](SubscriptionReader::close)-initiated shutdown.
    pub fn error(&self) -> Option<Error> {
        self.error.lock().clone()
    }
}

impl Drop for SubscriptionReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producer side handed to the transport task feeding a [`SubscriptionReader`].
#[derive(Clone, Debug)]
pub struct SubscriptionSender {
    tx: mpsc::Sender<Value>,
    cancel: CancellationToken,
    error: Arc<Mutex<Option<Error>>>,
}

impl SubscriptionSender {
    /// Delivers one message. Returns `false` once the reader is gone or the
    /// stream was closed; the producer loop should stop then.
    pub async fn send(&self, value: Value) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(value) => sent.is_ok(),
        }
    }

    /// Records the terminal error, unless the consumer already closed the
    /// stream (a cancellation-caused failure is not an error).
    pub fn fail(&self, error: Error) {
        if !self.cancel.is_cancelled() {
            *self.error.lock() = Some(error);
        }
    }

    /// Resolves when the consumer closes the stream.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Creates a bounded reader/sender pair for a streamed operation.
pub fn subscription_channel(capacity: usize) -> (SubscriptionSender, SubscriptionReader) {
    let (tx, rx) = mpsc::channel(capacity);
    let cancel = CancellationToken::new();
    let error = Arc::new(Mutex::new(None));
    (
        SubscriptionSender {
            tx,
            cancel: cancel.clone(),
            error: error.clone(),
        },
        SubscriptionReader { rx, cancel, error },
    )
}

/// The abstract capability surface a remote function-execution backend
/// exposes. Every transport implements this; dispatch depends on nothing
/// else.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    async fn set_secrets(&self, input: SetSecretsInput) -> SetSecretsOutput;

    async fn field_resolve(&self, input: FieldResolveInput) -> FieldResolveOutput;

    async fn interface_resolve_type(
        &self,
        input: InterfaceResolveTypeInput,
    ) -> InterfaceResolveTypeOutput;

    async fn union_resolve_type(&self, input: UnionResolveTypeInput) -> UnionResolveTypeOutput;

    async fn scalar_parse(&self, input: ScalarParseInput) -> ScalarParseOutput;

    async fn scalar_serialize(&self, input: ScalarSerializeInput) -> ScalarSerializeOutput;

    async fn authorize(&self, input: AuthorizeInput) -> AuthorizeOutput;

    async fn subscription_connection(
        &self,
        input: SubscriptionConnectionInput,
    ) -> SubscriptionConnectionOutput;

    async fn subscription_listen(&self, input: SubscriptionListenInput)
    -> SubscriptionListenOutput;

    async fn stream(&self, input: StreamInput) -> StreamOutput;
}

/// What a driver author implements. Transports decode requests into inputs,
/// invoke the handler, and re-encode the result; a handler `Err` becomes a
/// wire error, never a transport failure.
///
/// Operations a driver does not support keep the default implementation.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn field_resolve(&self, input: FieldResolveInput) -> Result<Value, BoxError> {
        let _ = input;
        Err("field resolve is not implemented".into())
    }

    async fn interface_resolve_type(
        &self,
        input: InterfaceResolveTypeInput,
    ) -> Result<TypeRef, BoxError> {
        let _ = input;
        Err("interface resolve type is not implemented".into())
    }

    async fn union_resolve_type(&self, input: UnionResolveTypeInput) -> Result<TypeRef, BoxError> {
        let _ = input;
        Err("union resolve type is not implemented".into())
    }

    async fn scalar_parse(&self, input: ScalarParseInput) -> Result<Value, BoxError> {
        let _ = input;
        Err("scalar parse is not implemented".into())
    }

    async fn scalar_serialize(&self, input: ScalarSerializeInput) -> Result<Value, BoxError> {
        let _ = input;
        Err("scalar serialize is not implemented".into())
    }

    async fn set_secrets(&self, input: SetSecretsInput) -> Result<(), BoxError> {
        let _ = input;
        Ok(())
    }

    async fn authorize(&self, input: AuthorizeInput) -> Result<bool, BoxError> {
        let _ = input;
        Err("authorize is not implemented".into())
    }

    async fn subscription_connection(
        &self,
        input: SubscriptionConnectionInput,
    ) -> Result<Value, BoxError> {
        let _ = input;
        Err("subscription connection is not implemented".into())
    }

    async fn subscription_listen(
        &self,
        input: SubscriptionListenInput,
    ) -> Result<BoxStream<'static, Result<Value, BoxError>>, BoxError> {
        let _ = input;
        Err("subscription listen is not implemented".into())
    }

    async fn stream(
        &self,
        input: StreamInput,
    ) -> Result<BoxStream<'static, Result<Value, BoxError>>, BoxError> {
        let _ = input;
        Err("stream is not implemented".into())
    }
}
