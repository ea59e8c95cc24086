//! End-to-end exercises of the HTTP+Protobuf transport.

use async_trait::async_trait;
use maplit::btreemap;
use outpost_driver::types::TypeRef;
use outpost_driver::{
    BoxError, Driver, FieldResolveInput, Function, Handler, InterfaceResolveTypeInput,
    ResolveInfo, ScalarSerializeInput, SetSecretsInput, StreamInput, SubscriptionListenInput,
    UnionResolveTypeInput, Value,
};
use outpost_http::{HttpDriver, router};
use tokio::net::TcpListener;

struct TestHandler;

#[async_trait]
impl Handler for TestHandler {
    async fn field_resolve(&self, input: FieldResolveInput) -> Result<Value, BoxError> {
        match input.function.name.as_str() {
            "function" => Ok(Value::from("response")),
            "echoArg" => Ok(input.arguments.get("arg").cloned().unwrap_or_default()),
            "fail" => Err("resolver failed".into()),
            "panic" => panic!("kaboom"),
            name => Err(format!("unknown function {name}").into()),
        }
    }

    async fn union_resolve_type(&self, _input: UnionResolveTypeInput) -> Result<TypeRef, BoxError> {
        Ok(TypeRef::named("Droid"))
    }

    async fn scalar_serialize(&self, input: ScalarSerializeInput) -> Result<Value, BoxError> {
        Ok(input.value)
    }

    async fn set_secrets(&self, _input: SetSecretsInput) -> Result<(), BoxError> {
        Ok(())
    }
}

async fn start_driver() -> HttpDriver {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(TestHandler)).await.unwrap();
    });
    HttpDriver::new(format!("http://{addr}/")).unwrap()
}

#[tokio::test]
async fn field_resolve_success() {
    let driver = start_driver().await;
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("function"),
            source: Value::from("source data"),
            arguments: btreemap! {
                "arg".to_string() => Value::from("value"),
            },
            info: ResolveInfo {
                field_name: "field".to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.response, Value::from("response"));
}

#[tokio::test]
async fn handler_errors_ride_in_the_wire_error() {
    let driver = start_driver().await;
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("fail"),
            ..Default::default()
        })
        .await;
    assert_eq!(output.response, Value::Null);
    assert_eq!(output.error.unwrap().message, "resolver failed");
}

#[tokio::test]
async fn handler_panics_keep_the_exchange_successful() {
    let driver = start_driver().await;
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("panic"),
            ..Default::default()
        })
        .await;
    let message = output.error.unwrap().message;
    assert!(message.contains("handler panicked"), "{message}");
}

#[tokio::test]
async fn missing_function_name_fails_without_io() {
    // The validation error fires before any request is built, so even an
    // unroutable address never gets dialed.
    let driver = HttpDriver::new("http://192.0.2.1:9/").unwrap();
    let output = driver
        .interface_resolve_type(InterfaceResolveTypeInput::default())
        .await;
    assert_eq!(output.error.unwrap().message, "function name is required");
}

#[tokio::test]
async fn scalar_serialize_round_trips() {
    let driver = start_driver().await;
    let output = driver
        .scalar_serialize(ScalarSerializeInput {
            function: Function::new("serialize"),
            value: Value::List(vec![Value::Int(1), Value::from("two")]),
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(
        output.response,
        Value::List(vec![Value::Int(1), Value::from("two")])
    );
}

#[tokio::test]
async fn union_resolution_round_trips() {
    let driver = start_driver().await;
    let output = driver
        .union_resolve_type(UnionResolveTypeInput {
            function: Function::new("resolveType"),
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.type_ref, Some(TypeRef::named("Droid")));
}

#[tokio::test]
async fn streaming_operations_report_the_capability_gap() {
    let driver = start_driver().await;

    let output = driver
        .subscription_listen(SubscriptionListenInput {
            function: Function::new("onMessage"),
            ..Default::default()
        })
        .await;
    assert!(output.reader.is_none());
    assert_eq!(
        output.error.unwrap().message,
        "streaming operations are not supported over the http driver transport"
    );

    let output = driver
        .stream(StreamInput {
            function: Function::new("tail"),
            ..Default::default()
        })
        .await;
    assert!(output.reader.is_none());
    assert!(output.error.is_some());
}

#[tokio::test]
async fn unknown_message_types_get_a_plain_text_error() {
    // Reach under the driver to send a bogus message kind directly.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(TestHandler)).await.unwrap();
    });
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/"))
        .header(
            "content-type",
            "application/x-protobuf; message=NoSuchRequest",
        )
        .body(Vec::new())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let text = response.text().await.unwrap();
    assert!(text.contains("unsupported message type"), "{text}");
}
