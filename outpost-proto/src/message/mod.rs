//! Per-operation request/response builders.
//!
//! For every driver operation there are four symmetric conversions:
//! `make_x_request` (input → wire, router side), `make_x_input` (wire →
//! input, driver side), `make_x_response` (handler result → wire, driver
//! side) and `make_x_output` (wire → output, router side). Response decoding
//! always checks the carried error first; when set, the payload is skipped.

mod authorize;
mod common;
mod field_resolve;
mod resolve_type;
mod scalar;
mod secrets;
mod stream;
mod subscription;

pub use authorize::{
    make_authorize_input, make_authorize_output, make_authorize_request, make_authorize_response,
};
pub use common::{
    decode_operation_definition, decode_resolve_info, decode_type_ref, encode_operation_definition,
    encode_resolve_info, encode_type_ref,
};
pub use field_resolve::{
    make_field_resolve_input, make_field_resolve_output, make_field_resolve_request,
    make_field_resolve_response,
};
pub use resolve_type::{
    make_interface_resolve_type_input, make_interface_resolve_type_output,
    make_interface_resolve_type_request, make_interface_resolve_type_response,
    make_union_resolve_type_input, make_union_resolve_type_output,
    make_union_resolve_type_request, make_union_resolve_type_response,
};
pub use scalar::{
    make_scalar_parse_input, make_scalar_parse_output, make_scalar_parse_request,
    make_scalar_parse_response, make_scalar_serialize_input, make_scalar_serialize_output,
    make_scalar_serialize_request, make_scalar_serialize_response,
};
pub use secrets::{
    make_set_secrets_input, make_set_secrets_output, make_set_secrets_request,
    make_set_secrets_response,
};
pub use stream::{
    make_stream_input, make_stream_message, make_stream_request, stream_end_message,
};
pub use subscription::{
    make_subscription_connection_input, make_subscription_connection_output,
    make_subscription_connection_request, make_subscription_connection_response,
    make_subscription_listen_input, make_subscription_listen_message,
    make_subscription_listen_request, subscription_end_message,
};
