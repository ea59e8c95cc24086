use outpost_driver::{StreamInput, Value as HostValue};

use super::common::{decode_function, decode_resolve_info, encode_function, encode_resolve_info,
    info_variables};
use crate::ProtoError;
use crate::driver as proto;
use crate::value::{decode_map, encode, encode_map};

pub fn make_stream_request(input: StreamInput) -> Result<proto::StreamRequest, ProtoError> {
    Ok(proto::StreamRequest {
        function: Some(encode_function(&input.function)),
        arguments: encode_map(&input.arguments),
        info: Some(encode_resolve_info(&input.info)),
    })
}

pub fn make_stream_input(request: proto::StreamRequest) -> Result<StreamInput, ProtoError> {
    let variables = info_variables(request.info.as_ref());
    Ok(StreamInput {
        function: decode_function(request.function),
        arguments: decode_map(&request.arguments, &variables)?,
        info: decode_resolve_info(request.info.as_ref(), &variables)?,
    })
}

/// Wraps one streamed value for the wire.
pub fn make_stream_message(response: &HostValue) -> proto::StreamMessage {
    proto::StreamMessage {
        response: Some(encode(response)),
        error: None,
    }
}

/// The terminal message reporting a mid-stream failure.
pub fn stream_end_message(error: Option<outpost_driver::Error>) -> proto::StreamMessage {
    proto::StreamMessage {
        response: None,
        error: error.map(|error| proto::Error { msg: error.message }),
    }
}

#[cfg(test)]
mod tests {
    use outpost_driver::Function;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn stream_request_round_trips() {
        let input = StreamInput {
            function: Function::new("tail"),
            ..Default::default()
        };
        let round_tripped = make_stream_input(make_stream_request(input.clone()).unwrap()).unwrap();
        assert_eq!(round_tripped, input);
    }
}
