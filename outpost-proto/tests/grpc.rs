//! End-to-end exercises of the gRPC transport: a real server hosting a test
//! handler, a real client, ephemeral localhost ports.

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use maplit::btreemap;
use outpost_driver::types::TypeRef;
use outpost_driver::{
    BoxError, Driver, FieldResolveInput, Function, Handler, InterfaceResolveTypeInput,
    ResolveInfo, ScalarParseInput, SetSecretsInput, StreamInput, SubscriptionListenInput,
    UnionResolveTypeInput, Value,
};
use outpost_proto::server::{DriverService, serve_with_incoming};
use outpost_proto::GrpcDriver;
use tokio::net::TcpListener;

struct TestHandler;

#[async_trait]
impl Handler for TestHandler {
    async fn field_resolve(&self, input: FieldResolveInput) -> Result<Value, BoxError> {
        match input.function.name.as_str() {
            "function" => Ok(Value::from("response")),
            "echoArg" => Ok(input.arguments.get("arg").cloned().unwrap_or_default()),
            "echoSource" => Ok(input.source),
            "fail" => Err("resolver failed".into()),
            "panic" => panic!("kaboom"),
            name => Err(format!("unknown function {name}").into()),
        }
    }

    async fn interface_resolve_type(
        &self,
        _input: InterfaceResolveTypeInput,
    ) -> Result<TypeRef, BoxError> {
        Ok(TypeRef::named("Droid"))
    }

    async fn union_resolve_type(&self, input: UnionResolveTypeInput) -> Result<TypeRef, BoxError> {
        input
            .value
            .get("__typename")
            .and_then(|v| v.as_str())
            .map(TypeRef::named)
            .ok_or_else(|| "no __typename".into())
    }

    async fn scalar_parse(&self, input: ScalarParseInput) -> Result<Value, BoxError> {
        match input.value {
            Value::String(s) => Ok(Value::Int(s.len() as i64)),
            other => Err(format!("cannot parse {other:?}").into()),
        }
    }

    async fn set_secrets(&self, input: SetSecretsInput) -> Result<(), BoxError> {
        if input.secrets.contains_key("BAD") {
            return Err("secret rejected".into());
        }
        Ok(())
    }

    async fn subscription_listen(
        &self,
        input: SubscriptionListenInput,
    ) -> Result<BoxStream<'static, Result<Value, BoxError>>, BoxError> {
        match input.function.name.as_str() {
            "counter" => Ok(Box::pin(stream::iter(
                (0..3i64).map(|i| Ok(Value::Int(i))),
            ))),
            "endless" => Ok(Box::pin(stream::unfold(0i64, |i| async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Some((Ok(Value::Int(i)), i + 1))
            }))),
            "broken" => Ok(Box::pin(stream::iter(vec![
                Ok(Value::Int(0)),
                Err(BoxError::from("subscription source failed")),
            ]))),
            name => Err(format!("unknown subscription {name}").into()),
        }
    }

    async fn stream(
        &self,
        _input: StreamInput,
    ) -> Result<BoxStream<'static, Result<Value, BoxError>>, BoxError> {
        Ok(Box::pin(stream::iter(
            ["a", "b"].map(|s| Ok(Value::from(s))),
        )))
    }
}

async fn start_driver() -> GrpcDriver {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_with_incoming(DriverService::new(TestHandler), listener));
    GrpcDriver::connect(format!("http://{addr}"))
        .await
        .unwrap()
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
async fn field_resolve_round_trips_nested_source() {
    let driver = start_driver().await;
    let source = Value::Object(btreemap! {
        "bytes".to_string() => Value::Bytes(vec![1, 2, 3]),
        "nested".to_string() => Value::List(vec![Value::Int(-1), Value::Uint(2), Value::Null]),
    });
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("echoSource"),
            source: source.clone(),
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.response, source);
}

#[tokio::test]
async fn variables_substitute_on_the_receiving_side() {
    use outpost_driver::types::{OperationDefinition, VariableDefinition};

    let driver = start_driver().await;
    let operation = OperationDefinition {
        operation: "query".to_string(),
        variable_definitions: vec![VariableDefinition {
            variable: "x".to_string(),
            default_value: Some(Value::Int(1)),
        }],
        ..Default::default()
    };

    // No request-time value: the declared default applies.
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("echoArg"),
            arguments: btreemap! {
                "arg".to_string() => Value::Variable("x".to_string()),
            },
            info: ResolveInfo {
                operation: Some(operation.clone()),
                ..Default::default()
            },
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.response, Value::Int(1));

    // A request-time value overrides the default.
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("echoArg"),
            arguments: btreemap! {
                "arg".to_string() => Value::Variable("x".to_string()),
            },
            info: ResolveInfo {
                operation: Some(operation),
                variable_values: btreemap! {
                    "x".to_string() => Value::Int(2),
                },
                ..Default::default()
            },
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.response, Value::Int(2));
}

#[tokio::test]
async fn handler_errors_become_output_errors() {
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
async fn handler_panics_become_output_errors() {
    let driver = start_driver().await;
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("panic"),
            ..Default::default()
        })
        .await;
    let message = output.error.unwrap().message;
    assert!(message.contains("handler panicked"), "{message}");
    assert!(message.contains("kaboom"), "{message}");

    // The server survives the panic.
    let output = driver
        .field_resolve(FieldResolveInput {
            function: Function::new("function"),
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
}

#[tokio::test]
async fn missing_function_name_fails_without_io() {
    let live = start_driver().await;
    let output = live
        .interface_resolve_type(InterfaceResolveTypeInput::default())
        .await;
    assert_eq!(output.error.unwrap().message, "function name is required");
    assert_eq!(output.type_ref, None);

    let output = live
        .union_resolve_type(UnionResolveTypeInput::default())
        .await;
    assert_eq!(output.error.unwrap().message, "function name is required");
}

#[tokio::test]
async fn type_resolution_round_trips() {
    let driver = start_driver().await;
    let output = driver
        .interface_resolve_type(InterfaceResolveTypeInput {
            function: Function::new("resolveType"),
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.type_ref, Some(TypeRef::named("Droid")));

    let output = driver
        .union_resolve_type(UnionResolveTypeInput {
            function: Function::new("resolveType"),
            value: Value::Object(btreemap! {
                "__typename".to_string() => Value::from("Starship"),
            }),
            ..Default::default()
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.type_ref, Some(TypeRef::named("Starship")));
}

#[tokio::test]
async fn scalar_parse_round_trips() {
    let driver = start_driver().await;
    let output = driver
        .scalar_parse(ScalarParseInput {
            function: Function::new("parse"),
            value: Value::from("12345"),
        })
        .await;
    assert_eq!(output.error, None);
    assert_eq!(output.response, Value::Int(5));
}

#[tokio::test]
async fn set_secrets_round_trips_errors() {
    let driver = start_driver().await;
    let ok = driver
        .set_secrets(SetSecretsInput {
            secrets: btreemap! { "KEY".to_string() => "v".to_string() },
        })
        .await;
    assert_eq!(ok.error, None);

    let rejected = driver
        .set_secrets(SetSecretsInput {
            secrets: btreemap! { "BAD".to_string() => "v".to_string() },
        })
        .await;
    assert_eq!(rejected.error.unwrap().message, "secret rejected");
}

#[tokio::test]
async fn subscription_listen_delivers_in_order_then_ends() {
    let driver = start_driver().await;
    let output = driver
        .subscription_listen(SubscriptionListenInput {
            function: Function::new("counter"),
            ..Default::default()
        })
        .await;
    assert!(output.error.is_none());
    let mut reader = output.reader.unwrap();
    assert_eq!(reader.next().await, Some(Value::Int(0)));
    assert_eq!(reader.next().await, Some(Value::Int(1)));
    assert_eq!(reader.next().await, Some(Value::Int(2)));
    assert_eq!(reader.next().await, None);
    assert_eq!(reader.error(), None);
}

#[tokio::test]
async fn subscription_listen_close_is_a_clean_shutdown() {
    let driver = start_driver().await;
    let output = driver
        .subscription_listen(SubscriptionListenInput {
            function: Function::new("endless"),
            ..Default::default()
        })
        .await;
    let mut reader = output.reader.unwrap();
    assert!(reader.next().await.is_some());
    reader.close();
    while reader.next().await.is_some() {}
    assert_eq!(reader.error(), None);
}

#[tokio::test]
async fn subscription_listen_surfaces_mid_stream_failures() {
    let driver = start_driver().await;
    let output = driver
        .subscription_listen(SubscriptionListenInput {
            function: Function::new("broken"),
            ..Default::default()
        })
        .await;
    let mut reader = output.reader.unwrap();
    assert_eq!(reader.next().await, Some(Value::Int(0)));
    assert_eq!(reader.next().await, None);
    let error = reader.error().unwrap();
    assert!(
        error.message.contains("subscription source failed"),
        "{}",
        error.message
    );
}

#[tokio::test]
async fn stream_delivers_values() {
    let driver = start_driver().await;
    let output = driver
        .stream(StreamInput {
            function: Function::new("tail"),
            ..Default::default()
        })
        .await;
    let mut reader = output.reader.unwrap();
    assert_eq!(reader.next().await, Some(Value::from("a")));
    assert_eq!(reader.next().await, Some(Value::from("b")));
    assert_eq!(reader.next().await, None);
    assert_eq!(reader.error(), None);
}

#[tokio::test]
async fn unimplemented_operations_report_errors_not_failures() {
    let driver = start_driver().await;
    let output = driver
        .authorize(outpost_driver::AuthorizeInput {
            function: Function::new("authorize"),
            query: "{ hero }".to_string(),
            ..Default::default()
        })
        .await;
    assert_eq!(
        output.error.unwrap().message,
        "authorize is not implemented"
    );
    assert!(!output.response);
}
