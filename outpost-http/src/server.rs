//! HTTP driver server: one `POST` route dispatching on the content-type
//! message parameter.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use futures::FutureExt;
use outpost_driver::{
    BoxError, Error, FieldResolveOutput, Handler, InterfaceResolveTypeOutput, ScalarParseOutput,
    ScalarSerializeOutput, SetSecretsOutput, SubscriptionConnectionOutput, UnionResolveTypeOutput,
};
use outpost_proto::driver as proto;
use outpost_proto::message::{
    make_authorize_input, make_authorize_response, make_field_resolve_input,
    make_field_resolve_response, make_interface_resolve_type_input,
    make_interface_resolve_type_response, make_scalar_parse_input, make_scalar_parse_response,
    make_scalar_serialize_input, make_scalar_serialize_response, make_set_secrets_input,
    make_set_secrets_response, make_subscription_connection_input,
    make_subscription_connection_response, make_union_resolve_type_input,
    make_union_resolve_type_response,
};
use prost::Message;

use crate::{PROTOBUF_CONTENT_TYPE, STREAMING_UNSUPPORTED, content_type};

/// Builds the single-endpoint router hosting a driver [`Handler`].
pub fn router<H: Handler>(handler: H) -> Router {
    Router::new()
        .route("/", post(handle::<H>))
        .with_state(Arc::new(handler))
}

async fn handle<H: Handler>(
    State(handler): State<Arc<H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message = match request_message_name(&headers) {
        Ok(message) => message,
        Err(err) => return (StatusCode::BAD_REQUEST, err).into_response(),
    };

    match message.as_str() {
        "FieldResolveRequest" => field_resolve(handler, body).await,
        "InterfaceResolveTypeRequest" => interface_resolve_type(handler, body).await,
        "UnionResolveTypeRequest" => union_resolve_type(handler, body).await,
        "ScalarParseRequest" => scalar_parse(handler, body).await,
        "ScalarSerializeRequest" => scalar_serialize(handler, body).await,
        "SetSecretsRequest" => set_secrets(handler, body).await,
        "AuthorizeRequest" => authorize(handler, body).await,
        "SubscriptionConnectionRequest" => subscription_connection(handler, body).await,
        "StreamRequest" | "SubscriptionListenRequest" => {
            (StatusCode::BAD_REQUEST, STREAMING_UNSUPPORTED.to_string()).into_response()
        }
        other => (
            StatusCode::BAD_REQUEST,
            format!("unsupported message type '{other}'"),
        )
            .into_response(),
    }
}

fn request_message_name(headers: &HeaderMap) -> Result<String, String> {
    let value = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| "missing content type".to_string())?
        .to_str()
        .map_err(|_| "content type is not valid ascii".to_string())?;
    let mime: mime::Mime = value
        .parse()
        .map_err(|_| format!("unparsable content type '{value}'"))?;
    if mime.essence_str() != PROTOBUF_CONTENT_TYPE {
        return Err(format!(
            "unexpected content type '{}', expected '{PROTOBUF_CONTENT_TYPE}'",
            mime.essence_str()
        ));
    }
    mime.get_param("message")
        .map(|name| name.as_str().to_string())
        .ok_or_else(|| "content type is missing the message parameter".to_string())
}

fn decode_request<M: Message + Default>(message_name: &str, body: Bytes) -> Result<M, Response> {
    M::decode(body).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            format!("malformed {message_name}: {err}"),
        )
            .into_response()
    })
}

fn protobuf_response<M: Message>(message_name: &str, message: M) -> Response {
    (
        [(header::CONTENT_TYPE, content_type(message_name))],
        message.encode_to_vec(),
    )
        .into_response()
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

/// Same panic/error convention as the gRPC server: the HTTP exchange
/// succeeds and the failure rides in the wire error.
async fn catch<T>(
    fut: impl std::future::Future<Output = Result<T, BoxError>>,
) -> Result<T, Error> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Error::new(err.to_string())),
        Err(panic) => Err(Error::new(panic_message(panic))),
    }
}

async fn field_resolve<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request = match decode_request::<proto::FieldResolveRequest>("FieldResolveRequest", body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let output = match make_field_resolve_input(request) {
        Ok(input) => match catch(handler.field_resolve(input)).await {
            Ok(response) => FieldResolveOutput {
                response,
                error: None,
            },
            Err(error) => FieldResolveOutput::from_error(error),
        },
        Err(err) => FieldResolveOutput::from_error(Error::from(err)),
    };
    protobuf_response("FieldResolveResponse", make_field_resolve_response(output))
}

async fn interface_resolve_type<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request = match decode_request::<proto::InterfaceResolveTypeRequest>(
        "InterfaceResolveTypeRequest",
        body,
    ) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let output = match make_interface_resolve_type_input(request) {
        Ok(input) => match catch(handler.interface_resolve_type(input)).await {
            Ok(type_ref) => InterfaceResolveTypeOutput {
                type_ref: Some(type_ref),
                error: None,
            },
            Err(error) => InterfaceResolveTypeOutput::from_error(error),
        },
        Err(err) => InterfaceResolveTypeOutput::from_error(Error::from(err)),
    };
    protobuf_response(
        "InterfaceResolveTypeResponse",
        make_interface_resolve_type_response(output),
    )
}

async fn union_resolve_type<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request =
        match decode_request::<proto::UnionResolveTypeRequest>("UnionResolveTypeRequest", body) {
            Ok(request) => request,
            Err(response) => return response,
        };
    let output = match make_union_resolve_type_input(request) {
        Ok(input) => match catch(handler.union_resolve_type(input)).await {
            Ok(type_ref) => UnionResolveTypeOutput {
                type_ref: Some(type_ref),
                error: None,
            },
            Err(error) => UnionResolveTypeOutput::from_error(error),
        },
        Err(err) => UnionResolveTypeOutput::from_error(Error::from(err)),
    };
    protobuf_response(
        "UnionResolveTypeResponse",
        make_union_resolve_type_response(output),
    )
}

async fn scalar_parse<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request = match decode_request::<proto::ScalarParseRequest>("ScalarParseRequest", body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let output = match make_scalar_parse_input(request) {
        Ok(input) => match catch(handler.scalar_parse(input)).await {
            Ok(response) => ScalarParseOutput {
                response,
                error: None,
            },
            Err(error) => ScalarParseOutput::from_error(error),
        },
        Err(err) => ScalarParseOutput::from_error(Error::from(err)),
    };
    protobuf_response("ScalarParseResponse", make_scalar_parse_response(output))
}

async fn scalar_serialize<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request =
        match decode_request::<proto::ScalarSerializeRequest>("ScalarSerializeRequest", body) {
            Ok(request) => request,
            Err(response) => return response,
        };
    let output = match make_scalar_serialize_input(request) {
        Ok(input) => match catch(handler.scalar_serialize(input)).await {
            Ok(response) => ScalarSerializeOutput {
                response,
                error: None,
            },
            Err(error) => ScalarSerializeOutput::from_error(error),
        },
        Err(err) => ScalarSerializeOutput::from_error(Error::from(err)),
    };
    protobuf_response(
        "ScalarSerializeResponse",
        make_scalar_serialize_response(output),
    )
}

async fn set_secrets<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request = match decode_request::<proto::SetSecretsRequest>("SetSecretsRequest", body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let output = match make_set_secrets_input(request) {
        Ok(input) => match catch(handler.set_secrets(input)).await {
            Ok(()) => SetSecretsOutput { error: None },
            Err(error) => SetSecretsOutput::from_error(error),
        },
        Err(err) => SetSecretsOutput::from_error(Error::from(err)),
    };
    protobuf_response("SetSecretsResponse", make_set_secrets_response(output))
}

async fn authorize<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request = match decode_request::<proto::AuthorizeRequest>("AuthorizeRequest", body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let output = match make_authorize_input(request) {
        Ok(input) => match catch(handler.authorize(input)).await {
            Ok(response) => outpost_driver::AuthorizeOutput {
                response,
                error: None,
            },
            Err(error) => outpost_driver::AuthorizeOutput::from_error(error),
        },
        Err(err) => outpost_driver::AuthorizeOutput::from_error(Error::from(err)),
    };
    protobuf_response("AuthorizeResponse", make_authorize_response(output))
}

async fn subscription_connection<H: Handler>(handler: Arc<H>, body: Bytes) -> Response {
    let request = match decode_request::<proto::SubscriptionConnectionRequest>(
        "SubscriptionConnectionRequest",
        body,
    ) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let output = match make_subscription_connection_input(request) {
        Ok(input) => match catch(handler.subscription_connection(input)).await {
            Ok(response) => SubscriptionConnectionOutput {
                response,
                error: None,
            },
            Err(error) => SubscriptionConnectionOutput::from_error(error),
        },
        Err(err) => SubscriptionConnectionOutput::from_error(Error::from(err)),
    };
    protobuf_response(
        "SubscriptionConnectionResponse",
        make_subscription_connection_response(output),
    )
}
