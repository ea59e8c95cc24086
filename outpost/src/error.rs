use displaydoc::Display;
use outpost_driver::Value;
use outpost_driver::types::ResponsePath;
use thiserror::Error;

/// Errors raised while building a router from configuration. All of these
/// are hard failures at build time, never at first call.
#[derive(Clone, Debug, Display, Eq, PartialEq, Error)]
pub enum RouterError {
    /// unknown environment '{0}'
    UnknownEnvironment(String),
    /// no environment configured and none set as default
    NoDefaultEnvironment,
    /// no driver registered for provider '{provider}' and runtime '{runtime}'
    DriverNotFound { provider: String, runtime: String },
    /// environment '{0}' has no address
    MissingAddress(String),
    /// unknown runtime '{0}'
    UnknownRuntime(String),
    /// no plugin driver registered under '{0}'
    UnknownPlugin(String),
    /// transport error: {0}
    Transport(String),
}

/// A failed dispatch call, wrapped with the target function name for
/// context.
#[derive(Clone, Debug, Display, Eq, PartialEq, Error)]
pub enum DispatchError {
    /// function '{function}' failed: {message}
    Call { function: String, message: String },
    /// driver rejected secrets: {0}
    Secrets(String),
}

/// A fatal interface/union/scalar resolution failure. The engine adapter's
/// boundary converts this into a per-field GraphQL error; sibling field
/// resolutions are unaffected.
#[derive(Clone, Debug, Display, Eq, PartialEq, Error)]
pub enum ResolutionError {
    /// {0}
    Dispatch(DispatchError),
    /// driver resolved no type
    MissingType,
    /// resolved type '{0}' is not present in the schema
    UnknownType(String),
}

impl From<DispatchError> for ResolutionError {
    fn from(err: DispatchError) -> Self {
        ResolutionError::Dispatch(err)
    }
}

/// The error shape handed back to the GraphQL execution engine: the field is
/// nulled and this lands in the response's top-level `errors` array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphqlError {
    pub message: String,
    /// Response path of the failed field, outermost segment first.
    pub path: Vec<Value>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn at(mut self, path: &ResponsePath) -> Self {
        self.path = path_segments(path);
        self
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GraphqlError {}

impl From<DispatchError> for GraphqlError {
    fn from(err: DispatchError) -> Self {
        GraphqlError::new(err.to_string())
    }
}

impl From<ResolutionError> for GraphqlError {
    fn from(err: ResolutionError) -> Self {
        GraphqlError::new(err.to_string())
    }
}

/// Unrolls the reversed path chain into outermost-first segments.
pub fn path_segments(path: &ResponsePath) -> Vec<Value> {
    let mut segments = Vec::new();
    let mut current = Some(path);
    while let Some(node) = current {
        segments.push(node.key.clone());
        current = node.prev.as_deref();
    }
    segments.reverse();
    segments
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn call_errors_carry_the_function_name() {
        let err = DispatchError::Call {
            function: "getHero".to_string(),
            message: "driver unreachable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "function 'getHero' failed: driver unreachable"
        );
    }

    #[test]
    fn graphql_errors_unroll_the_path() {
        let path = ResponsePath::new("hero").child(0i64).child("name");
        let error = GraphqlError::new("boom").at(&path);
        assert_eq!(
            error.path,
            vec![Value::from("hero"), Value::Int(0), Value::from("name")]
        );
    }
}
