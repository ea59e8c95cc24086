use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Boxed error used at the [`Handler`](crate::Handler) seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application-level error carried in operation outputs and on the wire.
///
/// Transports fold every failure mode — network errors, protocol errors,
/// handler errors — into this one shape so call sites have a single
/// `out.error` check.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Errors raised while turning a host value into a [`Value`](crate::Value).
#[derive(Clone, Debug, Display, Eq, PartialEq, ThisError)]
pub enum EncodeError {
    /// map key must be a string
    KeyMustBeAString,
    /// {0}
    Message(String),
}

impl serde::ser::Error for EncodeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        EncodeError::Message(msg.to_string())
    }
}

/// Errors raised while decoding a wire value or deserializing a [`Value`](crate::Value).
#[derive(Clone, Debug, Display, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    /// {0}
    Message(String),
}

impl serde::de::Error for DecodeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        DecodeError::Message(msg.to_string())
    }
}
