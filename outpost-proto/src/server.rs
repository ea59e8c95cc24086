//! gRPC driver server harness.
//!
//! Hosts a user [`Handler`] behind the generated service. Handler errors and
//! panics never fail the RPC for unary operations; they are converted into
//! the wire `Error` so every transport shares one error-surfacing
//! convention. The stdout/stderr byte streams are fed by [`LogStreams`], a
//! `tracing-subscriber` writer that tees emitted lines to connected
//! clients.

use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::{FutureExt, Stream, StreamExt, stream};
use outpost_driver::{
    BoxError, Error, FieldResolveOutput, Handler, InterfaceResolveTypeOutput, ScalarParseOutput,
    ScalarSerializeOutput, SetSecretsOutput, SubscriptionConnectionOutput, UnionResolveTypeOutput,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing_subscriber::fmt::MakeWriter;

use crate::driver::driver_server::{self, DriverServer};
use crate::driver::{
    AuthorizeRequest, AuthorizeResponse, ByteStream, ByteStreamRequest, FieldResolveRequest,
    FieldResolveResponse, InterfaceResolveTypeRequest, InterfaceResolveTypeResponse,
    ScalarParseRequest, ScalarParseResponse, ScalarSerializeRequest, ScalarSerializeResponse,
    SetSecretsRequest, SetSecretsResponse, StreamMessage, StreamRequest,
    SubscriptionConnectionRequest, SubscriptionConnectionResponse, SubscriptionListenMessage,
    SubscriptionListenRequest, UnionResolveTypeRequest, UnionResolveTypeResponse,
};
use crate::message::{
    make_authorize_input, make_authorize_response, make_field_resolve_input,
    make_field_resolve_response, make_interface_resolve_type_input,
    make_interface_resolve_type_response, make_scalar_parse_input, make_scalar_parse_response,
    make_scalar_serialize_input, make_scalar_serialize_response, make_set_secrets_input,
    make_set_secrets_response, make_stream_input, make_stream_message,
    make_subscription_connection_input, make_subscription_connection_response,
    make_subscription_listen_input, make_subscription_listen_message,
    make_union_resolve_type_input, make_union_resolve_type_response, stream_end_message,
    subscription_end_message,
};

/// Lines buffered per byte stream before slow clients start missing chunks.
const LOG_BUFFER: usize = 64;

/// Broadcast channels backing the `Stdout`/`Stderr` RPCs.
///
/// Install a writer into a `tracing-subscriber` layer to forward everything
/// the driver logs:
///
/// ```ignore
/// let service = DriverService::new(handler);
/// tracing_subscriber::fmt()
///     .with_writer(service.log_streams().stdout_writer())
///     .init();
/// ```
#[derive(Clone, Debug)]
pub struct LogStreams {
    stdout: broadcast::Sender<Vec<u8>>,
    stderr: broadcast::Sender<Vec<u8>>,
}

impl LogStreams {
    pub fn new() -> Self {
        let (stdout, _) = broadcast::channel(LOG_BUFFER);
        let (stderr, _) = broadcast::channel(LOG_BUFFER);
        Self { stdout, stderr }
    }

    pub fn stdout_writer(&self) -> ByteStreamWriter {
        ByteStreamWriter {
            tx: self.stdout.clone(),
        }
    }

    pub fn stderr_writer(&self) -> ByteStreamWriter {
        ByteStreamWriter {
            tx: self.stderr.clone(),
        }
    }

    fn subscribe_stdout(&self) -> broadcast::Receiver<Vec<u8>> {
        self.stdout.subscribe()
    }

    fn subscribe_stderr(&self) -> broadcast::Receiver<Vec<u8>> {
        self.stderr.subscribe()
    }
}

impl Default for LogStreams {
    fn default() -> Self {
        Self::new()
    }
}

/// An `io::Write`/`MakeWriter` that tees written bytes to stream clients.
/// Writes never block and are dropped when no client is connected.
#[derive(Clone, Debug)]
pub struct ByteStreamWriter {
    tx: broadcast::Sender<Vec<u8>>,
}

impl std::io::Write for ByteStreamWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.tx.send(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for ByteStreamWriter {
    type Writer = ByteStreamWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// The generated driver service bound to a user [`Handler`].
#[derive(Debug)]
pub struct DriverService<H> {
    handler: Arc<H>,
    logs: LogStreams,
}

impl<H: Handler> DriverService<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            logs: LogStreams::new(),
        }
    }

    pub fn log_streams(&self) -> LogStreams {
        self.logs.clone()
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

/// Runs a handler future, converting a panic into an error message instead
/// of letting it take the whole server down.
async fn catch<T>(
    fut: impl Future<Output = Result<T, BoxError>>,
) -> Result<T, Error> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Error::new(err.to_string())),
        Err(panic) => Err(Error::new(panic_message(panic))),
    }
}

type ServerStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

#[tonic::async_trait]
impl<H: Handler> driver_server::Driver for DriverService<H> {
    async fn field_resolve(
        &self,
        request: Request<FieldResolveRequest>,
    ) -> Result<Response<FieldResolveResponse>, Status> {
        let output = match make_field_resolve_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.field_resolve(input)).await {
                Ok(response) => FieldResolveOutput {
                    response,
                    error: None,
                },
                Err(error) => FieldResolveOutput::from_error(error),
            },
            Err(err) => FieldResolveOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_field_resolve_response(output)))
    }

    async fn interface_resolve_type(
        &self,
        request: Request<InterfaceResolveTypeRequest>,
    ) -> Result<Response<InterfaceResolveTypeResponse>, Status> {
        let output = match make_interface_resolve_type_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.interface_resolve_type(input)).await {
                Ok(type_ref) => InterfaceResolveTypeOutput {
                    type_ref: Some(type_ref),
                    error: None,
                },
                Err(error) => InterfaceResolveTypeOutput::from_error(error),
            },
            Err(err) => InterfaceResolveTypeOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_interface_resolve_type_response(output)))
    }

    async fn union_resolve_type(
        &self,
        request: Request<UnionResolveTypeRequest>,
    ) -> Result<Response<UnionResolveTypeResponse>, Status> {
        let output = match make_union_resolve_type_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.union_resolve_type(input)).await {
                Ok(type_ref) => UnionResolveTypeOutput {
                    type_ref: Some(type_ref),
                    error: None,
                },
                Err(error) => UnionResolveTypeOutput::from_error(error),
            },
            Err(err) => UnionResolveTypeOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_union_resolve_type_response(output)))
    }

    async fn scalar_parse(
        &self,
        request: Request<ScalarParseRequest>,
    ) -> Result<Response<ScalarParseResponse>, Status> {
        let output = match make_scalar_parse_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.scalar_parse(input)).await {
                Ok(response) => ScalarParseOutput {
                    response,
                    error: None,
                },
                Err(error) => ScalarParseOutput::from_error(error),
            },
            Err(err) => ScalarParseOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_scalar_parse_response(output)))
    }

    async fn scalar_serialize(
        &self,
        request: Request<ScalarSerializeRequest>,
    ) -> Result<Response<ScalarSerializeResponse>, Status> {
        let output = match make_scalar_serialize_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.scalar_serialize(input)).await {
                Ok(response) => ScalarSerializeOutput {
                    response,
                    error: None,
                },
                Err(error) => ScalarSerializeOutput::from_error(error),
            },
            Err(err) => ScalarSerializeOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_scalar_serialize_response(output)))
    }

    async fn set_secrets(
        &self,
        request: Request<SetSecretsRequest>,
    ) -> Result<Response<SetSecretsResponse>, Status> {
        let output = match make_set_secrets_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.set_secrets(input)).await {
                Ok(()) => SetSecretsOutput { error: None },
                Err(error) => SetSecretsOutput::from_error(error),
            },
            Err(err) => SetSecretsOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_set_secrets_response(output)))
    }

    async fn authorize(
        &self,
        request: Request<AuthorizeRequest>,
    ) -> Result<Response<AuthorizeResponse>, Status> {
        let output = match make_authorize_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.authorize(input)).await {
                Ok(response) => outpost_driver::AuthorizeOutput {
                    response,
                    error: None,
                },
                Err(error) => outpost_driver::AuthorizeOutput::from_error(error),
            },
            Err(err) => outpost_driver::AuthorizeOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_authorize_response(output)))
    }

    async fn subscription_connection(
        &self,
        request: Request<SubscriptionConnectionRequest>,
    ) -> Result<Response<SubscriptionConnectionResponse>, Status> {
        let output = match make_subscription_connection_input(request.into_inner()) {
            Ok(input) => match catch(self.handler.subscription_connection(input)).await {
                Ok(response) => SubscriptionConnectionOutput {
                    response,
                    error: None,
                },
                Err(error) => SubscriptionConnectionOutput::from_error(error),
            },
            Err(err) => SubscriptionConnectionOutput::from_error(Error::from(err)),
        };
        Ok(Response::new(make_subscription_connection_response(output)))
    }

    type SubscriptionListenStream = ServerStream<SubscriptionListenMessage>;

    async fn subscription_listen(
        &self,
        request: Request<SubscriptionListenRequest>,
    ) -> Result<Response<Self::SubscriptionListenStream>, Status> {
        let input = make_subscription_listen_input(request.into_inner())
            .map_err(|err| Status::invalid_argument(err.to_string()))?;
        // No error field exists on the message: setup failures surface as
        // status errors, which clients fold into the output like any other
        // transport failure.
        let values = catch(self.handler.subscription_listen(input))
            .await
            .map_err(|error| Status::internal(error.message))?;
        let messages = values
            .map(|item| match item {
                Ok(value) => Ok(make_subscription_listen_message(&value)),
                Err(err) => Err(Status::internal(err.to_string())),
            })
            .chain(stream::once(async { Ok(subscription_end_message()) }));
        Ok(Response::new(Box::pin(messages)))
    }

    type StreamStream = ServerStream<StreamMessage>;

    async fn stream(
        &self,
        request: Request<StreamRequest>,
    ) -> Result<Response<Self::StreamStream>, Status> {
        let input = make_stream_input(request.into_inner())
            .map_err(|err| Status::invalid_argument(err.to_string()))?;
        match catch(self.handler.stream(input)).await {
            Ok(values) => {
                let messages = values.map(|item| match item {
                    Ok(value) => Ok(make_stream_message(&value)),
                    Err(err) => Ok(stream_end_message(Some(Error::new(err.to_string())))),
                });
                Ok(Response::new(Box::pin(messages) as Self::StreamStream))
            }
            // The message carries an error field, so even setup failures
            // keep the RPC itself successful.
            Err(error) => {
                let messages = stream::once(async move { Ok(stream_end_message(Some(error))) });
                Ok(Response::new(Box::pin(messages) as Self::StreamStream))
            }
        }
    }

    type StdoutStream = ServerStream<ByteStream>;

    async fn stdout(
        &self,
        _request: Request<ByteStreamRequest>,
    ) -> Result<Response<Self::StdoutStream>, Status> {
        Ok(Response::new(byte_stream(self.logs.subscribe_stdout())))
    }

    type StderrStream = ServerStream<ByteStream>;

    async fn stderr(
        &self,
        _request: Request<ByteStreamRequest>,
    ) -> Result<Response<Self::StderrStream>, Status> {
        Ok(Response::new(byte_stream(self.logs.subscribe_stderr())))
    }
}

fn byte_stream(rx: broadcast::Receiver<Vec<u8>>) -> ServerStream<ByteStream> {
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(data) => Some(Ok(ByteStream { data })),
            // A lagging client misses chunks rather than erroring out.
            Err(BroadcastStreamRecvError::Lagged(_)) => None,
        }
    });
    Box::pin(stream)
}

/// Serves a handler on the supplied address until the process ends.
pub async fn serve<H: Handler>(
    service: DriverService<H>,
    addr: SocketAddr,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(DriverServer::new(service))
        .serve(addr)
        .await
}

/// Serves a handler on an already-bound listener; useful for ephemeral
/// ports.
pub async fn serve_with_incoming<H: Handler>(
    service: DriverService<H>,
    listener: TcpListener,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(DriverServer::new(service))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
}
