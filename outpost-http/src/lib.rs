//! HTTP+Protobuf driver transport.
//!
//! A driver is one `POST` endpoint. The request and response bodies are the
//! same protobuf messages the gRPC transport uses; the message kind is
//! negotiated through the content type:
//!
//! ```text
//! content-type: application/x-protobuf; message=FieldResolveRequest
//! ```
//!
//! Non-200 responses carry a plain-text error body, not a wire message.
//! Exactly one message kind per request; streaming operations are not
//! supported over this transport and report an explicit error output.

pub mod client;
pub mod server;

pub use client::HttpDriver;
pub use server::router;

pub(crate) const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// The driver does not implement `Stream`/`SubscriptionListen`; the
/// dispatch layer must tolerate this capability gap.
pub(crate) const STREAMING_UNSUPPORTED: &str =
    "streaming operations are not supported over the http driver transport";

pub(crate) fn content_type(message_name: &str) -> String {
    format!("{PROTOBUF_CONTENT_TYPE}; message={message_name}")
}
