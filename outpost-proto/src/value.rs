//! The value codec: wire `Value` ⇄ dynamic [`HostValue`].
//!
//! Decoding is two-phase by construction: the wire structure decodes
//! mechanically, and `variable` arms are substituted against the
//! [`Variables`] map supplied by the caller — assembled from the operation's
//! declared defaults overridden by request-time values. A variable with no
//! entry decodes to nil rather than erroring, as does a wire value with no
//! arm set.

use std::collections::HashMap;

use outpost_driver::Value as HostValue;

use crate::ProtoError;
use crate::driver::{ArrayValue, ObjectValue, OperationDefinition, Value, value::Kind};

/// Wire-level variable values in effect for one request.
pub type Variables = HashMap<String, Value>;

/// Assembles the effective variable map for a request: declared defaults
/// first, request-time values on top.
pub fn variables(operation: Option<&OperationDefinition>, values: &Variables) -> Variables {
    let mut merged = Variables::new();
    if let Some(operation) = operation {
        for definition in &operation.variable_definitions {
            let (Some(variable), Some(default_value)) =
                (&definition.variable, &definition.default_value)
            else {
                continue;
            };
            merged.insert(variable.name.clone(), default_value.clone());
        }
    }
    for (name, value) in values {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Encodes a dynamic value into its wire form.
pub fn encode(value: &HostValue) -> Value {
    let kind = match value {
        HostValue::Null => Kind::Nil(true),
        HostValue::Int(i) => Kind::IntValue(*i),
        HostValue::Uint(u) => Kind::UintValue(*u),
        HostValue::Float(f) => Kind::FloatValue(*f),
        HostValue::String(s) => Kind::StringValue(s.clone()),
        HostValue::Bool(b) => Kind::BoolValue(*b),
        HostValue::Bytes(b) => Kind::BytesValue(b.clone()),
        HostValue::List(items) => Kind::ArrayValue(ArrayValue {
            items: items.iter().map(encode).collect(),
        }),
        HostValue::Object(map) => Kind::ObjectValue(ObjectValue {
            props: map
                .iter()
                .map(|(key, value)| (key.clone(), encode(value)))
                .collect(),
        }),
        HostValue::Variable(name) => Kind::Variable(name.clone()),
    };
    Value { kind: Some(kind) }
}

/// Encodes a map of dynamic values, preserving keys.
pub fn encode_map(
    map: &std::collections::BTreeMap<String, HostValue>,
) -> HashMap<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

/// Decodes a wire value, substituting variables from `variables`.
///
/// An unset arm decodes to nil at any depth; a missing variable decodes to
/// nil; the first failing child fails the whole enclosing decode.
pub fn decode(value: &Value, variables: &Variables) -> Result<HostValue, ProtoError> {
    let Some(kind) = &value.kind else {
        return Ok(HostValue::Null);
    };
    Ok(match kind {
        Kind::Nil(_) => HostValue::Null,
        Kind::IntValue(i) => HostValue::Int(*i),
        Kind::UintValue(u) => HostValue::Uint(*u),
        Kind::FloatValue(f) => HostValue::Float(*f),
        Kind::StringValue(s) => HostValue::String(s.clone()),
        Kind::BoolValue(b) => HostValue::Bool(*b),
        Kind::BytesValue(b) => HostValue::Bytes(b.clone()),
        Kind::ArrayValue(array) => HostValue::List(
            array
                .items
                .iter()
                .map(|item| decode(item, variables))
                .collect::<Result<_, _>>()?,
        ),
        Kind::ObjectValue(object) => HostValue::Object(
            object
                .props
                .iter()
                .map(|(key, value)| Ok((key.clone(), decode(value, variables)?)))
                .collect::<Result<_, ProtoError>>()?,
        ),
        Kind::Variable(name) => match variables.get(name) {
            Some(value) => decode(value, variables)?,
            None => HostValue::Null,
        },
    })
}

/// Decodes a map of wire values, preserving keys.
pub fn decode_map(
    map: &HashMap<String, Value>,
    variables: &Variables,
) -> Result<std::collections::BTreeMap<String, HostValue>, ProtoError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), decode(value, variables)?)))
        .collect()
}
