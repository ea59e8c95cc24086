use outpost_driver::{
    Error, SubscriptionConnectionInput, SubscriptionConnectionOutput, SubscriptionListenInput,
    Value as HostValue,
};

use super::common::{
    decode_function, decode_operation_definition, decode_plain_variable_values,
    encode_function, encode_operation_definition,
};
use crate::ProtoError;
use crate::driver as proto;
use crate::value::{Variables, decode, encode, encode_map};

pub fn make_subscription_connection_request(
    input: SubscriptionConnectionInput,
) -> Result<proto::SubscriptionConnectionRequest, ProtoError> {
    Ok(proto::SubscriptionConnectionRequest {
        function: Some(encode_function(&input.function)),
        query: input.query,
        operation_name: input.operation_name.unwrap_or_default(),
        variable_values: encode_map(&input.variable_values),
        protocol: Some(encode(&input.protocol)),
    })
}

pub fn make_subscription_connection_input(
    request: proto::SubscriptionConnectionRequest,
) -> Result<SubscriptionConnectionInput, ProtoError> {
    Ok(SubscriptionConnectionInput {
        function: decode_function(request.function),
        query: request.query,
        operation_name: (!request.operation_name.is_empty()).then_some(request.operation_name),
        variable_values: decode_plain_variable_values(&request.variable_values)?,
        protocol: request
            .protocol
            .as_ref()
            .map(|protocol| decode(protocol, &Variables::new()))
            .transpose()?
            .unwrap_or_default(),
    })
}

pub fn make_subscription_connection_response(
    output: SubscriptionConnectionOutput,
) -> proto::SubscriptionConnectionResponse {
    proto::SubscriptionConnectionResponse {
        response: Some(encode(&output.response)),
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_subscription_connection_output(
    response: proto::SubscriptionConnectionResponse,
) -> SubscriptionConnectionOutput {
    if let Some(error) = response.error {
        return SubscriptionConnectionOutput::from_error(error.msg);
    }
    match response
        .response
        .as_ref()
        .map(|value| decode(value, &Variables::new()))
        .transpose()
    {
        Ok(value) => SubscriptionConnectionOutput {
            response: value.unwrap_or(HostValue::Null),
            error: None,
        },
        Err(err) => SubscriptionConnectionOutput::from_error(Error::from(err)),
    }
}

pub fn make_subscription_listen_request(
    input: SubscriptionListenInput,
) -> Result<proto::SubscriptionListenRequest, ProtoError> {
    Ok(proto::SubscriptionListenRequest {
        function: Some(encode_function(&input.function)),
        query: input.query,
        operation_name: input.operation_name.unwrap_or_default(),
        variable_values: encode_map(&input.variable_values),
        protocol: Some(encode(&input.protocol)),
        operation: input.operation.as_ref().map(encode_operation_definition),
    })
}

pub fn make_subscription_listen_input(
    request: proto::SubscriptionListenRequest,
) -> Result<SubscriptionListenInput, ProtoError> {
    let variables =
        crate::value::variables(request.operation.as_ref(), &request.variable_values);
    Ok(SubscriptionListenInput {
        function: decode_function(request.function),
        query: request.query,
        operation_name: (!request.operation_name.is_empty()).then_some(request.operation_name),
        variable_values: decode_plain_variable_values(&request.variable_values)?,
        protocol: request
            .protocol
            .as_ref()
            .map(|protocol| decode(protocol, &variables))
            .transpose()?
            .unwrap_or_default(),
        operation: request
            .operation
            .as_ref()
            .map(|operation| decode_operation_definition(operation, &variables))
            .transpose()?,
    })
}

/// Wraps one subscription event for the wire.
pub fn make_subscription_listen_message(payload: &HostValue) -> proto::SubscriptionListenMessage {
    proto::SubscriptionListenMessage {
        next: true,
        payload: Some(encode(payload)),
    }
}

/// The terminal message closing a subscription stream.
pub fn subscription_end_message() -> proto::SubscriptionListenMessage {
    proto::SubscriptionListenMessage {
        next: false,
        payload: None,
    }
}

#[cfg(test)]
mod tests {
    use outpost_driver::Function;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn listen_request_round_trips() {
        let input = SubscriptionListenInput {
            function: Function::new("onMessage"),
            query: "subscription { messages }".to_string(),
            operation_name: Some("Messages".to_string()),
            ..Default::default()
        };
        let round_tripped =
            make_subscription_listen_input(make_subscription_listen_request(input.clone()).unwrap())
                .unwrap();
        assert_eq!(round_tripped, input);
    }

    #[test]
    fn end_message_carries_no_payload() {
        let message = subscription_end_message();
        assert!(!message.next);
        assert_eq!(message.payload, None);
    }
}
