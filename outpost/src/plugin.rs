//! In-process plugin drivers.
//!
//! A plugin driver is a [`Handler`] compiled into the router binary and
//! registered under a provider name at startup; invoking it is a direct
//! trait call rather than a network round trip. The error conventions match
//! the networked transports exactly: handler failures land in the output's
//! error field, and a closed subscription reader cancels the producing
//! task.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use once_cell::sync::Lazy;
use outpost_driver::{
    AuthorizeInput, AuthorizeOutput, BoxError, Driver, Error, FieldResolveInput,
    FieldResolveOutput, Handler, InterfaceResolveTypeInput, InterfaceResolveTypeOutput,
    ScalarParseInput, ScalarParseOutput, ScalarSerializeInput, ScalarSerializeOutput,
    SetSecretsInput, SetSecretsOutput, StreamInput, StreamOutput, SubscriptionConnectionInput,
    SubscriptionConnectionOutput, SubscriptionListenInput, SubscriptionListenOutput,
    UnionResolveTypeInput, UnionResolveTypeOutput, subscription_channel,
};
use parking_lot::Mutex;

/// Subscription signals buffered between the pump task and the reader.
const SUBSCRIPTION_BUFFER: usize = 10;

static PLUGIN_DRIVERS: Lazy<Mutex<HashMap<String, Arc<dyn Handler>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Registers a handler under a provider name. Call during startup, before
/// the router is built.
pub fn register_plugin_driver(name: impl Into<String>, handler: Arc<dyn Handler>) {
    PLUGIN_DRIVERS.lock().insert(name.into(), handler);
}

/// Looks up a registered plugin driver by provider name.
pub fn plugin_driver(name: &str) -> Option<PluginDriver> {
    PLUGIN_DRIVERS
        .lock()
        .get(name)
        .cloned()
        .map(PluginDriver::new)
}

/// Names of all registered plugin drivers.
pub fn plugin_driver_names() -> Vec<String> {
    PLUGIN_DRIVERS.lock().keys().cloned().collect()
}

/// A [`Driver`] whose broker is an in-process trait call.
#[derive(Clone)]
pub struct PluginDriver {
    handler: Arc<dyn Handler>,
}

impl PluginDriver {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}

async fn catch<T>(
    fut: impl std::future::Future<Output = Result<T, BoxError>>,
) -> Result<T, Error> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Error::new(err.to_string())),
        Err(panic) => Err(Error::new(panic_message(panic))),
    }
}

#[async_trait::async_trait]
impl Driver for PluginDriver {
    async fn set_secrets(&self, input: SetSecretsInput) -> SetSecretsOutput {
        match catch(self.handler.set_secrets(input)).await {
            Ok(()) => SetSecretsOutput { error: None },
            Err(error) => SetSecretsOutput::from_error(error),
        }
    }

    async fn field_resolve(&self, input: FieldResolveInput) -> FieldResolveOutput {
        match catch(self.handler.field_resolve(input)).await {
            Ok(response) => FieldResolveOutput {
                response,
                error: None,
            },
            Err(error) => FieldResolveOutput::from_error(error),
        }
    }

    async fn interface_resolve_type(
        &self,
        input: InterfaceResolveTypeInput,
    ) -> InterfaceResolveTypeOutput {
        if input.function.name.is_empty() {
            return InterfaceResolveTypeOutput::from_error("function name is required");
        }
        match catch(self.handler.interface_resolve_type(input)).await {
            Ok(type_ref) => InterfaceResolveTypeOutput {
                type_ref: Some(type_ref),
                error: None,
            },
            Err(error) => InterfaceResolveTypeOutput::from_error(error),
        }
    }

    async fn union_resolve_type(&self, input: UnionResolveTypeInput) -> UnionResolveTypeOutput {
        if input.function.name.is_empty() {
            return UnionResolveTypeOutput::from_error("function name is required");
        }
        match catch(self.handler.union_resolve_type(input)).await {
            Ok(type_ref) => UnionResolveTypeOutput {
                type_ref: Some(type_ref),
                error: None,
            },
            Err(error) => UnionResolveTypeOutput::from_error(error),
        }
    }

    async fn scalar_parse(&self, input: ScalarParseInput) -> ScalarParseOutput {
        match catch(self.handler.scalar_parse(input)).await {
            Ok(response) => ScalarParseOutput {
                response,
                error: None,
            },
            Err(error) => ScalarParseOutput::from_error(error),
        }
    }

    async fn scalar_serialize(&self, input: ScalarSerializeInput) -> ScalarSerializeOutput {
        match catch(self.handler.scalar_serialize(input)).await {
            Ok(response) => ScalarSerializeOutput {
                response,
                error: None,
            },
            Err(error) => ScalarSerializeOutput::from_error(error),
        }
    }

    async fn authorize(&self, input: AuthorizeInput) -> AuthorizeOutput {
        match catch(self.handler.authorize(input)).await {
            Ok(response) => AuthorizeOutput {
                response,
                error: None,
            },
            Err(error) => AuthorizeOutput::from_error(error),
        }
    }

    async fn subscription_connection(
        &self,
        input: SubscriptionConnectionInput,
    ) -> SubscriptionConnectionOutput {
        match catch(self.handler.subscription_connection(input)).await {
            Ok(response) => SubscriptionConnectionOutput {
                response,
                error: None,
            },
            Err(error) => SubscriptionConnectionOutput::from_error(error),
        }
    }

    async fn subscription_listen(
        &self,
        input: SubscriptionListenInput,
    ) -> SubscriptionListenOutput {
        let mut values = match catch(self.handler.subscription_listen(input)).await {
            Ok(values) => values,
            Err(error) => return SubscriptionListenOutput::from_error(error),
        };
        let (sender, reader) = subscription_channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.cancelled() => break,
                    item = values.next() => match item {
                        Some(Ok(value)) => {
                            if !sender.send(value).await {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            sender.fail(Error::new(err.to_string()));
                            break;
                        }
                        None => break,
                    },
                }
            }
        });
        SubscriptionListenOutput {
            reader: Some(reader),
            error: None,
        }
    }

    async fn stream(&self, input: StreamInput) -> StreamOutput {
        let mut values = match catch(self.handler.stream(input)).await {
            Ok(values) => values,
            Err(error) => return StreamOutput::from_error(error),
        };
        let (sender, reader) = subscription_channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.cancelled() => break,
                    item = values.next() => match item {
                        Some(Ok(value)) => {
                            if !sender.send(value).await {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            sender.fail(Error::new(err.to_string()));
                            break;
                        }
                        None => break,
                    },
                }
            }
        });
        StreamOutput {
            reader: Some(reader),
            error: None,
        }
    }
}
