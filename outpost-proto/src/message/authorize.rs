use outpost_driver::{AuthorizeInput, AuthorizeOutput};

use super::common::{decode_function, decode_plain_variable_values, encode_function};
use crate::ProtoError;
use crate::driver as proto;
use crate::value::{Variables, decode, encode, encode_map};

pub fn make_authorize_request(
    input: AuthorizeInput,
) -> Result<proto::AuthorizeRequest, ProtoError> {
    Ok(proto::AuthorizeRequest {
        function: Some(encode_function(&input.function)),
        query: input.query,
        operation_name: input.operation_name.unwrap_or_default(),
        variable_values: encode_map(&input.variable_values),
        protocol: Some(encode(&input.protocol)),
    })
}

pub fn make_authorize_input(
    request: proto::AuthorizeRequest,
) -> Result<AuthorizeInput, ProtoError> {
    Ok(AuthorizeInput {
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

pub fn make_authorize_response(output: AuthorizeOutput) -> proto::AuthorizeResponse {
    proto::AuthorizeResponse {
        response: output.response,
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_authorize_output(response: proto::AuthorizeResponse) -> AuthorizeOutput {
    if let Some(error) = response.error {
        return AuthorizeOutput::from_error(error.msg);
    }
    AuthorizeOutput {
        response: response.response,
        error: None,
    }
}
