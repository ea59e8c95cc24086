use outpost_driver::{
    InterfaceResolveTypeInput, InterfaceResolveTypeOutput, UnionResolveTypeInput,
    UnionResolveTypeOutput,
};

use super::common::{
    decode_function, decode_resolve_info, decode_type_ref, encode_function, encode_resolve_info,
    encode_type_ref, info_variables,
};
use crate::ProtoError;
use crate::driver as proto;
use crate::value::{decode, encode};

pub fn make_interface_resolve_type_request(
    input: InterfaceResolveTypeInput,
) -> Result<proto::InterfaceResolveTypeRequest, ProtoError> {
    // The target function is a required field; reject before any wire I/O.
    if input.function.name.is_empty() {
        return Err(ProtoError::FunctionNameRequired);
    }
    Ok(proto::InterfaceResolveTypeRequest {
        function: Some(encode_function(&input.function)),
        value: Some(encode(&input.value)),
        info: Some(encode_resolve_info(&input.info)),
    })
}

pub fn make_interface_resolve_type_input(
    request: proto::InterfaceResolveTypeRequest,
) -> Result<InterfaceResolveTypeInput, ProtoError> {
    let variables = info_variables(request.info.as_ref());
    Ok(InterfaceResolveTypeInput {
        function: decode_function(request.function),
        value: request
            .value
            .as_ref()
            .map(|value| decode(value, &variables))
            .transpose()?
            .unwrap_or_default(),
        info: decode_resolve_info(request.info.as_ref(), &variables)?,
    })
}

pub fn make_interface_resolve_type_response(
    output: InterfaceResolveTypeOutput,
) -> proto::InterfaceResolveTypeResponse {
    proto::InterfaceResolveTypeResponse {
        r#type: output.type_ref.as_ref().map(encode_type_ref),
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_interface_resolve_type_output(
    response: proto::InterfaceResolveTypeResponse,
) -> InterfaceResolveTypeOutput {
    if let Some(error) = response.error {
        return InterfaceResolveTypeOutput::from_error(error.msg);
    }
    InterfaceResolveTypeOutput {
        type_ref: response.r#type.as_ref().and_then(decode_type_ref),
        error: None,
    }
}

pub fn make_union_resolve_type_request(
    input: UnionResolveTypeInput,
) -> Result<proto::UnionResolveTypeRequest, ProtoError> {
    if input.function.name.is_empty() {
        return Err(ProtoError::FunctionNameRequired);
    }
    Ok(proto::UnionResolveTypeRequest {
        function: Some(encode_function(&input.function)),
        value: Some(encode(&input.value)),
        info: Some(encode_resolve_info(&input.info)),
    })
}

pub fn make_union_resolve_type_input(
    request: proto::UnionResolveTypeRequest,
) -> Result<UnionResolveTypeInput, ProtoError> {
    let variables = info_variables(request.info.as_ref());
    Ok(UnionResolveTypeInput {
        function: decode_function(request.function),
        value: request
            .value
            .as_ref()
            .map(|value| decode(value, &variables))
            .transpose()?
            .unwrap_or_default(),
        info: decode_resolve_info(request.info.as_ref(), &variables)?,
    })
}

pub fn make_union_resolve_type_response(
    output: UnionResolveTypeOutput,
) -> proto::UnionResolveTypeResponse {
    proto::UnionResolveTypeResponse {
        r#type: output.type_ref.as_ref().map(encode_type_ref),
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_union_resolve_type_output(
    response: proto::UnionResolveTypeResponse,
) -> UnionResolveTypeOutput {
    if let Some(error) = response.error {
        return UnionResolveTypeOutput::from_error(error.msg);
    }
    UnionResolveTypeOutput {
        type_ref: response.r#type.as_ref().and_then(decode_type_ref),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use outpost_driver::types::TypeRef;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_function_name_is_rejected_before_io() {
        let err = make_interface_resolve_type_request(InterfaceResolveTypeInput::default())
            .unwrap_err();
        assert_eq!(err, ProtoError::FunctionNameRequired);
        assert_eq!(err.to_string(), "function name is required");

        let err = make_union_resolve_type_request(UnionResolveTypeInput::default()).unwrap_err();
        assert_eq!(err, ProtoError::FunctionNameRequired);
    }

    #[test]
    fn resolved_type_round_trips() {
        let output = UnionResolveTypeOutput {
            type_ref: Some(TypeRef::named("Droid")),
            error: None,
        };
        let decoded = make_union_resolve_type_output(make_union_resolve_type_response(output));
        assert_eq!(decoded.type_ref, Some(TypeRef::named("Droid")));
        assert_eq!(decoded.error, None);
    }

    #[test]
    fn error_responses_skip_the_payload() {
        let response = proto::InterfaceResolveTypeResponse {
            r#type: Some(encode_type_ref(&TypeRef::named("Ignored"))),
            error: Some(proto::Error {
                msg: "no such type".to_string(),
            }),
        };
        let output = make_interface_resolve_type_output(response);
        assert_eq!(output.type_ref, None);
        assert_eq!(output.error.unwrap().message, "no such type");
    }
}
