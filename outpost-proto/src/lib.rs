//! Wire protocol and gRPC transport for the outpost routing runtime.
//!
//! The protobuf schema in `proto/driver.proto` is the one wire contract
//! shared by every transport; the HTTP transport reuses these message types
//! with a different framing. This crate owns the value codec (wire value ⇄
//! dynamic [`outpost_driver::Value`]), the per-operation request/response
//! builders, and the gRPC client and server.

// tonic does not derive `Eq` for generated message types; silence the clippy
// lint the same way the generated code consumers upstream do.
#![allow(clippy::derive_partial_eq_without_eq)]

pub mod driver {
    tonic::include_proto!("driver");
}

pub mod client;
pub mod logs;
pub mod message;
pub mod server;
pub mod value;

pub use client::GrpcDriver;
pub use server::{DriverService, LogStreams, serve, serve_with_incoming};
pub use value::{Variables, decode, encode, variables};

use displaydoc::Display;
use thiserror::Error;

/// Errors raised while building or decoding wire messages.
#[derive(Clone, Debug, Display, Eq, PartialEq, Error)]
pub enum ProtoError {
    /// function name is required
    FunctionNameRequired,
    /// {0}
    Decode(String),
    /// {0}
    Encode(String),
}

impl From<outpost_driver::DecodeError> for ProtoError {
    fn from(err: outpost_driver::DecodeError) -> Self {
        ProtoError::Decode(err.to_string())
    }
}

impl From<outpost_driver::EncodeError> for ProtoError {
    fn from(err: outpost_driver::EncodeError) -> Self {
        ProtoError::Encode(err.to_string())
    }
}

impl From<ProtoError> for outpost_driver::Error {
    fn from(err: ProtoError) -> Self {
        outpost_driver::Error::new(err.to_string())
    }
}
