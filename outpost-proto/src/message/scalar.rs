use outpost_driver::{
    Error, ScalarParseInput, ScalarParseOutput, ScalarSerializeInput, ScalarSerializeOutput,
    Value as HostValue,
};

use super::common::{decode_function, encode_function};
use crate::ProtoError;
use crate::driver as proto;
use crate::value::{Variables, decode, encode};

pub fn make_scalar_parse_request(
    input: ScalarParseInput,
) -> Result<proto::ScalarParseRequest, ProtoError> {
    Ok(proto::ScalarParseRequest {
        function: Some(encode_function(&input.function)),
        value: Some(encode(&input.value)),
    })
}

pub fn make_scalar_parse_input(
    request: proto::ScalarParseRequest,
) -> Result<ScalarParseInput, ProtoError> {
    Ok(ScalarParseInput {
        function: decode_function(request.function),
        value: request
            .value
            .as_ref()
            .map(|value| decode(value, &Variables::new()))
            .transpose()?
            .unwrap_or_default(),
    })
}

pub fn make_scalar_parse_response(output: ScalarParseOutput) -> proto::ScalarParseResponse {
    proto::ScalarParseResponse {
        value: Some(encode(&output.response)),
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_scalar_parse_output(response: proto::ScalarParseResponse) -> ScalarParseOutput {
    if let Some(error) = response.error {
        return ScalarParseOutput::from_error(error.msg);
    }
    match response
        .value
        .as_ref()
        .map(|value| decode(value, &Variables::new()))
        .transpose()
    {
        Ok(value) => ScalarParseOutput {
            response: value.unwrap_or(HostValue::Null),
            error: None,
        },
        Err(err) => ScalarParseOutput::from_error(Error::from(err)),
    }
}

pub fn make_scalar_serialize_request(
    input: ScalarSerializeInput,
) -> Result<proto::ScalarSerializeRequest, ProtoError> {
    Ok(proto::ScalarSerializeRequest {
        function: Some(encode_function(&input.function)),
        value: Some(encode(&input.value)),
    })
}

pub fn make_scalar_serialize_input(
    request: proto::ScalarSerializeRequest,
) -> Result<ScalarSerializeInput, ProtoError> {
    Ok(ScalarSerializeInput {
        function: decode_function(request.function),
        value: request
            .value
            .as_ref()
            .map(|value| decode(value, &Variables::new()))
            .transpose()?
            .unwrap_or_default(),
    })
}

pub fn make_scalar_serialize_response(
    output: ScalarSerializeOutput,
) -> proto::ScalarSerializeResponse {
    proto::ScalarSerializeResponse {
        value: Some(encode(&output.response)),
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_scalar_serialize_output(
    response: proto::ScalarSerializeResponse,
) -> ScalarSerializeOutput {
    if let Some(error) = response.error {
        return ScalarSerializeOutput::from_error(error.msg);
    }
    match response
        .value
        .as_ref()
        .map(|value| decode(value, &Variables::new()))
        .transpose()
    {
        Ok(value) => ScalarSerializeOutput {
            response: value.unwrap_or(HostValue::Null),
            error: None,
        },
        Err(err) => ScalarSerializeOutput::from_error(Error::from(err)),
    }
}
