use outpost_driver::{Error, FieldResolveInput, FieldResolveOutput, Value as HostValue};

use super::common::{decode_function, decode_resolve_info, encode_function, encode_resolve_info,
    info_variables};
use crate::ProtoError;
use crate::driver as proto;
use crate::value::{Variables, decode, decode_map, encode, encode_map};

pub fn make_field_resolve_request(
    input: FieldResolveInput,
) -> Result<proto::FieldResolveRequest, ProtoError> {
    Ok(proto::FieldResolveRequest {
        function: Some(encode_function(&input.function)),
        source: Some(encode(&input.source)),
        arguments: encode_map(&input.arguments),
        info: Some(encode_resolve_info(&input.info)),
        protocol: Some(encode(&input.protocol)),
        subscription_payload: Some(encode(&input.subscription_payload)),
    })
}

pub fn make_field_resolve_input(
    request: proto::FieldResolveRequest,
) -> Result<FieldResolveInput, ProtoError> {
    let variables = info_variables(request.info.as_ref());
    Ok(FieldResolveInput {
        function: decode_function(request.function),
        source: request
            .source
            .as_ref()
            .map(|source| decode(source, &variables))
            .transpose()?
            .unwrap_or_default(),
        arguments: decode_map(&request.arguments, &variables)?,
        info: decode_resolve_info(request.info.as_ref(), &variables)?,
        protocol: request
            .protocol
            .as_ref()
            .map(|protocol| decode(protocol, &variables))
            .transpose()?
            .unwrap_or_default(),
        subscription_payload: request
            .subscription_payload
            .as_ref()
            .map(|payload| decode(payload, &variables))
            .transpose()?
            .unwrap_or_default(),
    })
}

pub fn make_field_resolve_response(output: FieldResolveOutput) -> proto::FieldResolveResponse {
    proto::FieldResolveResponse {
        response: Some(encode(&output.response)),
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_field_resolve_output(response: proto::FieldResolveResponse) -> FieldResolveOutput {
    if let Some(error) = response.error {
        return FieldResolveOutput::from_error(error.msg);
    }
    match response
        .response
        .as_ref()
        .map(|value| decode(value, &Variables::new()))
        .transpose()
    {
        Ok(value) => FieldResolveOutput {
            response: value.unwrap_or(HostValue::Null),
            error: None,
        },
        Err(err) => FieldResolveOutput::from_error(Error::from(err)),
    }
}
