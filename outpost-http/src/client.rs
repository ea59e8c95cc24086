//! HTTP driver client.

use outpost_driver::{
    AuthorizeInput, AuthorizeOutput, Driver, Error, FieldResolveInput, FieldResolveOutput,
    InterfaceResolveTypeInput, InterfaceResolveTypeOutput, ScalarParseInput, ScalarParseOutput,
    ScalarSerializeInput, ScalarSerializeOutput, SetSecretsInput, SetSecretsOutput, StreamInput,
    StreamOutput, SubscriptionConnectionInput, SubscriptionConnectionOutput,
    SubscriptionListenInput, SubscriptionListenOutput, UnionResolveTypeInput,
    UnionResolveTypeOutput,
};
use outpost_proto::message::{
    make_authorize_output, make_authorize_request, make_field_resolve_output,
    make_field_resolve_request, make_interface_resolve_type_output,
    make_interface_resolve_type_request, make_scalar_parse_output, make_scalar_parse_request,
    make_scalar_serialize_output, make_scalar_serialize_request, make_set_secrets_output,
    make_set_secrets_request, make_subscription_connection_output,
    make_subscription_connection_request, make_union_resolve_type_output,
    make_union_resolve_type_request,
};
use prost::Message;
use reqwest::header::{CONTENT_TYPE, HeaderMap};

use crate::{PROTOBUF_CONTENT_TYPE, STREAMING_UNSUPPORTED, content_type};

/// A driver reachable over HTTP+Protobuf.
#[derive(Clone, Debug)]
pub struct HttpDriver {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpDriver {
    pub fn new(url: impl reqwest::IntoUrl) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: url.into_url()?,
        })
    }

    /// Uses a caller-configured client (timeouts, TLS, proxies).
    pub fn with_client(client: reqwest::Client, url: impl reqwest::IntoUrl) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client,
            url: url.into_url()?,
        })
    }

    /// One request/response exchange. The request content type names the
    /// message being sent; the response content type is validated against
    /// the expected response message.
    async fn call<Req: Message, Resp: Message + Default>(
        &self,
        request: Req,
        request_message: &str,
        response_message: &str,
    ) -> Result<Resp, Error> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, content_type(request_message))
            .body(request.encode_to_vec())
            .send()
            .await
            .map_err(|err| Error::new(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Failures carry a plain-text body, not a wire message.
            let text = response.text().await.unwrap_or_default();
            return Err(Error::new(if text.is_empty() {
                status.to_string()
            } else {
                text
            }));
        }

        validate_content_type(response.headers(), response_message)?;
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::new(err.to_string()))?;
        Resp::decode(body).map_err(|err| Error::new(format!("malformed {response_message}: {err}")))
    }
}

fn validate_content_type(headers: &HeaderMap, expected_message: &str) -> Result<(), Error> {
    let value = headers
        .get(CONTENT_TYPE)
        .ok_or_else(|| Error::new("response is missing a content type"))?
        .to_str()
        .map_err(|_| Error::new("response content type is not valid ascii"))?;
    let mime: mime::Mime = value
        .parse()
        .map_err(|_| Error::new(format!("unparsable response content type '{value}'")))?;
    if mime.essence_str() != PROTOBUF_CONTENT_TYPE {
        return Err(Error::new(format!(
            "unexpected response content type '{}'",
            mime.essence_str()
        )));
    }
    match mime.get_param("message") {
        Some(name) if name.as_str() == expected_message => Ok(()),
        Some(name) => Err(Error::new(format!(
            "unexpected response message '{}', expected '{expected_message}'",
            name.as_str()
        ))),
        None => Err(Error::new("response content type is missing the message parameter")),
    }
}

#[async_trait::async_trait]
impl Driver for HttpDriver {
    async fn set_secrets(&self, input: SetSecretsInput) -> SetSecretsOutput {
        let request = match make_set_secrets_request(input) {
            Ok(request) => request,
            Err(err) => return SetSecretsOutput::from_error(Error::from(err)),
        };
        match self
            .call(request, "SetSecretsRequest", "SetSecretsResponse")
            .await
        {
            Ok(response) => make_set_secrets_output(response),
            Err(error) => SetSecretsOutput::from_error(error),
        }
    }

    async fn field_resolve(&self, input: FieldResolveInput) -> FieldResolveOutput {
        let request = match make_field_resolve_request(input) {
            Ok(request) => request,
            Err(err) => return FieldResolveOutput::from_error(Error::from(err)),
        };
        match self
            .call(request, "FieldResolveRequest", "FieldResolveResponse")
            .await
        {
            Ok(response) => make_field_resolve_output(response),
            Err(error) => FieldResolveOutput::from_error(error),
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
        match self
            .call(
                request,
                "InterfaceResolveTypeRequest",
                "InterfaceResolveTypeResponse",
            )
            .await
        {
            Ok(response) => make_interface_resolve_type_output(response),
            Err(error) => InterfaceResolveTypeOutput::from_error(error),
        }
    }

    async fn union_resolve_type(&self, input: UnionResolveTypeInput) -> UnionResolveTypeOutput {
        let request = match make_union_resolve_type_request(input) {
            Ok(request) => request,
            Err(err) => return UnionResolveTypeOutput::from_error(Error::from(err)),
        };
        match self
            .call(
                request,
                "UnionResolveTypeRequest",
                "UnionResolveTypeResponse",
            )
            .await
        {
            Ok(response) => make_union_resolve_type_output(response),
            Err(error) => UnionResolveTypeOutput::from_error(error),
        }
    }

    async fn scalar_parse(&self, input: ScalarParseInput) -> ScalarParseOutput {
        let request = match make_scalar_parse_request(input) {
            Ok(request) => request,
            Err(err) => return ScalarParseOutput::from_error(Error::from(err)),
        };
        match self
            .call(request, "ScalarParseRequest", "ScalarParseResponse")
            .await
        {
            Ok(response) => make_scalar_parse_output(response),
            Err(error) => ScalarParseOutput::from_error(error),
        }
    }

    async fn scalar_serialize(&self, input: ScalarSerializeInput) -> ScalarSerializeOutput {
        let request = match make_scalar_serialize_request(input) {
            Ok(request) => request,
            Err(err) => return ScalarSerializeOutput::from_error(Error::from(err)),
        };
        match self
            .call(
                request,
                "ScalarSerializeRequest",
                "ScalarSerializeResponse",
            )
            .await
        {
            Ok(response) => make_scalar_serialize_output(response),
            Err(error) => ScalarSerializeOutput::from_error(error),
        }
    }

    async fn authorize(&self, input: AuthorizeInput) -> AuthorizeOutput {
        let request = match make_authorize_request(input) {
            Ok(request) => request,
            Err(err) => return AuthorizeOutput::from_error(Error::from(err)),
        };
        match self
            .call(request, "AuthorizeRequest", "AuthorizeResponse")
            .await
        {
            Ok(response) => make_authorize_output(response),
            Err(error) => AuthorizeOutput::from_error(error),
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
        match self
            .call(
                request,
                "SubscriptionConnectionRequest",
                "SubscriptionConnectionResponse",
            )
            .await
        {
            Ok(response) => make_subscription_connection_output(response),
            Err(error) => SubscriptionConnectionOutput::from_error(error),
        }
    }

    async fn subscription_listen(
        &self,
        _input: SubscriptionListenInput,
    ) -> SubscriptionListenOutput {
        SubscriptionListenOutput::from_error(STREAMING_UNSUPPORTED)
    }

    async fn stream(&self, _input: StreamInput) -> StreamOutput {
        StreamOutput::from_error(STREAMING_UNSUPPORTED)
    }
}
