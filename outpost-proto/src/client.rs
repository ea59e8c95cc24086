//! gRPC driver client.
//!
//! Every failure mode — connection errors, status errors, malformed
//! responses — is folded into the operation output's `error` field so call
//! sites have exactly one failure check regardless of transport.

use outpost_driver::{
    AuthorizeInput, AuthorizeOutput, Driver, Error, FieldResolveInput, FieldResolveOutput,
    InterfaceResolveTypeInput, InterfaceResolveTypeOutput, ScalarParseInput, ScalarParseOutput,
    ScalarSerializeInput, ScalarSerializeOutput, SetSecretsInput, SetSecretsOutput, StreamInput,
    StreamOutput, SubscriptionConnectionInput, SubscriptionConnectionOutput,
    SubscriptionListenInput, SubscriptionListenOutput, SubscriptionSender, UnionResolveTypeInput,
    UnionResolveTypeOutput, subscription_channel,
};
use tonic::transport::{Channel, Endpoint};

use crate::driver::driver_client::DriverClient;
use crate::driver::{ByteStreamRequest, SubscriptionListenMessage};
use crate::logs::{LogLevel, emit, parse_line};
use crate::message::{
    make_authorize_output, make_authorize_request, make_field_resolve_output,
    make_field_resolve_request, make_interface_resolve_type_output,
    make_interface_resolve_type_request, make_scalar_parse_output, make_scalar_parse_request,
    make_scalar_serialize_output, make_scalar_serialize_request, make_set_secrets_output,
    make_set_secrets_request, make_stream_request, make_subscription_connection_output,
    make_subscription_connection_request, make_subscription_listen_request,
    make_union_resolve_type_output, make_union_resolve_type_request,
};
use crate::value::{Variables, decode};

/// Subscription signals buffered between the receive loop and the reader.
const SUBSCRIPTION_BUFFER: usize = 10;

/// A driver reachable over gRPC.
#[derive(Clone, Debug)]
pub struct GrpcDriver {
    client: DriverClient<Channel>,
}

impl GrpcDriver {
    /// Connects to a driver at the supplied address.
    pub async fn connect(addr: impl Into<String>) -> Result<Self, tonic::transport::Error> {
        let endpoint = Endpoint::from_shared(addr.into())?;
        let client = DriverClient::connect(endpoint).await?;
        Ok(Self { client })
    }

    /// Wraps an already-established channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            client: DriverClient::new(channel),
        }
    }

    /// Spawns background tasks that pull the driver's stdout/stderr byte
    /// streams and re-emit each line through `tracing`, re-leveled from a
    /// `{"level", "message"}` JSON shape or a `[LEVEL]` prefix when present.
    pub fn forward_logs(&self) {
        tokio::spawn(forward_byte_stream(self.client.clone(), ByteSource::Stdout));
        tokio::spawn(forward_byte_stream(self.client.clone(), ByteSource::Stderr));
    }
}

#[derive(Clone, Copy)]
enum ByteSource {
    Stdout,
    Stderr,
}

async fn forward_byte_stream(mut client: DriverClient<Channel>, source: ByteSource) {
    let response = match source {
        ByteSource::Stdout => client.stdout(ByteStreamRequest {}).await,
        ByteSource::Stderr => client.stderr(ByteStreamRequest {}).await,
    };
    let mut stream = match response {
        Ok(response) => response.into_inner(),
        Err(status) => {
            tracing::debug!("driver byte stream unavailable: {status}");
            return;
        }
    };

    let default_level = match source {
        ByteSource::Stdout => LogLevel::Info,
        ByteSource::Stderr => LogLevel::Error,
    };
    let mut buf: Vec<u8> = Vec::new();
    loop {
        match stream.message().await {
            Ok(Some(chunk)) => {
                buf.extend_from_slice(&chunk.data);
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    let (level, message) = parse_line(line, default_level);
                    emit(level, &message);
                }
            }
            Ok(None) => break,
            Err(status) => {
                tracing::debug!("driver byte stream ended: {status}");
                break;
            }
        }
    }
}

fn status_error(status: tonic::Status) -> Error {
    Error::new(status.message().to_string())
}

#[async_trait::async_trait]
impl Driver for GrpcDriver {
    async fn set_secrets(&self, input: SetSecretsInput) -> SetSecretsOutput {
        let request = match make_set_secrets_request(input) {
            Ok(request) => request,
            Err(err) => return SetSecretsOutput::from_error(Error::from(err)),
        };
        match self.client.clone().set_secrets(request).await {
            Ok(response) => make_set_secrets_output(response.into_inner()),
            Err(status) => SetSecretsOutput::from_error(status_error(status)),
        }
    }

    async fn field_resolve(&self, input: FieldResolveInput) -> FieldResolveOutput {
        let request = match make_field_resolve_request(input) {
            Ok(request) => request,
            Err(err) => return FieldResolveOutput::from_error(Error::from(err)),
        };
        match self.client.clone().field_resolve(request).await {
            Ok(response) => make_field_resolve_output(response.into_inner()),
            Err(status) => FieldResolveOutput::from_error(status_error(status)),
        }
    }

    async fn interface_resolve_type(
        &self,
        input: InterfaceResolveTypeInput,
    ) -> InterfaceResolveTypeOutput {
        let request = match make_interface_resolve_type_request(input) {
            Ok(request) => request,
            Err(err) => return InterfaceResolveTypeOutput::from_error(Error::from(err)),
        };
        match self.client.clone().interface_resolve_type(request).await {
            Ok(response) => make_interface_resolve_type_output(response.into_inner()),
            Err(status) => InterfaceResolveTypeOutput::from_error(status_error(status)),
        }
    }

    async fn union_resolve_type(&self, input: UnionResolveTypeInput) -> UnionResolveTypeOutput {
        let request = match make_union_resolve_type_request(input) {
            Ok(request) => request,
            Err(err) => return UnionResolveTypeOutput::from_error(Error::from(err)),
        };
        match self.client.clone().union_resolve_type(request).await {
            Ok(response) => make_union_resolve_type_output(response.into_inner()),
            Err(status) => UnionResolveTypeOutput::from_error(status_error(status)),
        }
    }

    async fn scalar_parse(&self, input: ScalarParseInput) -> ScalarParseOutput {
        let request = match make_scalar_parse_request(input) {
            Ok(request) => request,
            Err(err) => return ScalarParseOutput::from_error(Error::from(err)),
        };
        match self.client.clone().scalar_parse(request).await {
            Ok(response) => make_scalar_parse_output(response.into_inner()),
            Err(status) => ScalarParseOutput::from_error(status_error(status)),
        }
    }

    async fn scalar_serialize(&self, input: ScalarSerializeInput) -> ScalarSerializeOutput {
        let request = match make_scalar_serialize_request(input) {
            Ok(request) => request,
            Err(err) => return ScalarSerializeOutput::from_error(Error::from(err)),
        };
        match self.client.clone().scalar_serialize(request).await {
            Ok(response) => make_scalar_serialize_output(response.into_inner()),
            Err(status) => ScalarSerializeOutput::from_error(status_error(status)),
        }
    }

    async fn authorize(&self, input: AuthorizeInput) -> AuthorizeOutput {
        let request = match make_authorize_request(input) {
            Ok(request) => request,
            Err(err) => return AuthorizeOutput::from_error(Error::from(err)),
        };
        match self.client.clone().authorize(request).await {
            Ok(response) => make_authorize_output(response.into_inner()),
            Err(status) => AuthorizeOutput::from_error(status_error(status)),
        }
    }

    async fn subscription_connection(
        &self,
        input: SubscriptionConnectionInput,
    ) -> SubscriptionConnectionOutput {
        let request = match make_subscription_connection_request(input) {
            Ok(request) => request,
            Err(err) => return SubscriptionConnectionOutput::from_error(Error::from(err)),
        };
        match self.client.clone().subscription_connection(request).await {
            Ok(response) => make_subscription_connection_output(response.into_inner()),
            Err(status) => SubscriptionConnectionOutput::from_error(status_error(status)),
        }
    }

    async fn subscription_listen(
        &self,
        input: SubscriptionListenInput,
    ) -> SubscriptionListenOutput {
        let request = match make_subscription_listen_request(input) {
            Ok(request) => request,
            Err(err) => return SubscriptionListenOutput::from_error(Error::from(err)),
        };
        let mut stream = match self.client.clone().subscription_listen(request).await {
            Ok(response) => response.into_inner(),
            Err(status) => return SubscriptionListenOutput::from_error(status_error(status)),
        };

        let (sender, reader) = subscription_channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Closing the reader cancels this loop; dropping the
                    // in-flight receive tears the RPC down with it.
                    _ = sender.cancelled() => break,
                    message = stream.message() => {
                        if !republish_listen_message(&sender, message).await {
                            break;
                        }
                    }
                }
            }
        });
        SubscriptionListenOutput {
            reader: Some(reader),
            error: None,
        }
    }

    async fn stream(&self, input: StreamInput) -> StreamOutput {
        let request = match make_stream_request(input) {
            Ok(request) => request,
            Err(err) => return StreamOutput::from_error(Error::from(err)),
        };
        let mut stream = match self.client.clone().stream(request).await {
            Ok(response) => response.into_inner(),
            Err(status) => return StreamOutput::from_error(status_error(status)),
        };

        let (sender, reader) = subscription_channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.cancelled() => break,
                    message = stream.message() => {
                        let proceed = match message {
                            Ok(Some(message)) => {
                                if let Some(error) = message.error {
                                    sender.fail(Error::new(error.msg));
                                    false
                                } else {
                                    match message
                                        .response
                                        .as_ref()
                                        .map(|value| decode(value, &Variables::new()))
                                        .transpose()
                                    {
                                        Ok(value) => {
                                            sender.send(value.unwrap_or_default()).await
                                        }
                                        Err(err) => {
                                            sender.fail(Error::from(err));
                                            false
                                        }
                                    }
                                }
                            }
                            Ok(None) => false,
                            Err(status) => {
                                sender.fail(status_error(status));
                                false
                            }
                        };
                        if !proceed {
                            break;
                        }
                    }
                }
            }
        });
        StreamOutput {
            reader: Some(reader),
            error: None,
        }
    }
}

/// Forwards one received listen message to the reader; returns `false` when
/// the loop should stop.
async fn republish_listen_message(
    sender: &SubscriptionSender,
    message: Result<Option<SubscriptionListenMessage>, tonic::Status>,
) -> bool {
    match message {
        Ok(Some(message)) => {
            if !message.next {
                return false;
            }
            match message
                .payload
                .as_ref()
                .map(|payload| decode(payload, &Variables::new()))
                .transpose()
            {
                Ok(payload) => sender.send(payload.unwrap_or_default()).await,
                Err(err) => {
                    sender.fail(Error::from(err));
                    false
                }
            }
        }
        Ok(None) => false,
        Err(status) => {
            sender.fail(status_error(status));
            false
        }
    }
}
