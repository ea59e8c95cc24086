use outpost_driver::{SetSecretsInput, SetSecretsOutput};

use crate::ProtoError;
use crate::driver as proto;

pub fn make_set_secrets_request(
    input: SetSecretsInput,
) -> Result<proto::SetSecretsRequest, ProtoError> {
    Ok(proto::SetSecretsRequest {
        secrets: input.secrets.into_iter().collect(),
    })
}

pub fn make_set_secrets_input(
    request: proto::SetSecretsRequest,
) -> Result<SetSecretsInput, ProtoError> {
    Ok(SetSecretsInput {
        secrets: request.secrets.into_iter().collect(),
    })
}

pub fn make_set_secrets_response(output: SetSecretsOutput) -> proto::SetSecretsResponse {
    proto::SetSecretsResponse {
        error: output.error.map(|error| proto::Error { msg: error.message }),
    }
}

pub fn make_set_secrets_output(response: proto::SetSecretsResponse) -> SetSecretsOutput {
    SetSecretsOutput {
        error: response.error.map(|error| error.msg.into()),
    }
}
