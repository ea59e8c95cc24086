//! Flattening of GraphQL AST literals into driver values.
//!
//! GraphQL documents carry literal values as typed AST nodes (inside
//! directive arguments, variable defaults, field arguments). Everything
//! downstream of the dispatch layer only ever sees plain [`Value`]s or
//! explicit [`Value::Variable`] placeholders, so the AST is reduced here
//! before any encoding happens. Variables are never resolved on the sending
//! side; the placeholder crosses the wire and is substituted by the receiver
//! against its own variable map.

use async_graphql_value::{ConstValue, Value as AstValue};

use crate::value::Value;

/// Reduces a GraphQL AST value to a plain [`Value`], keeping variables as
/// placeholders.
pub fn flatten(ast: AstValue) -> Value {
    match ast {
        AstValue::Variable(name) => Value::Variable(name.to_string()),
        AstValue::Null => Value::Null,
        AstValue::Number(number) => {
            if let Some(i) = number.as_i64() {
                Value::Int(i)
            } else if let Some(u) = number.as_u64() {
                Value::Uint(u)
            } else {
                Value::Float(number.as_f64().unwrap_or_default())
            }
        }
        AstValue::String(s) => Value::String(s),
        AstValue::Boolean(b) => Value::Bool(b),
        AstValue::Binary(bytes) => Value::Bytes(bytes.to_vec()),
        AstValue::Enum(name) => Value::String(name.to_string()),
        AstValue::List(items) => Value::List(items.into_iter().map(flatten).collect()),
        AstValue::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), flatten(value)))
                .collect(),
        ),
    }
}

/// Reduces a constant GraphQL AST value (no variables possible, e.g. a
/// variable definition's default) to a plain [`Value`].
pub fn flatten_const(ast: ConstValue) -> Value {
    match ast {
        ConstValue::Null => Value::Null,
        ConstValue::Number(number) => {
            if let Some(i) = number.as_i64() {
                Value::Int(i)
            } else if let Some(u) = number.as_u64() {
                Value::Uint(u)
            } else {
                Value::Float(number.as_f64().unwrap_or_default())
            }
        }
        ConstValue::String(s) => Value::String(s),
        ConstValue::Boolean(b) => Value::Bool(b),
        ConstValue::Binary(bytes) => Value::Bytes(bytes.to_vec()),
        ConstValue::Enum(name) => Value::String(name.to_string()),
        ConstValue::List(items) => Value::List(items.into_iter().map(flatten_const).collect()),
        ConstValue::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), flatten_const(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_value::{ConstValue, Name, Value as AstValue};
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn variables_become_placeholders() {
        let ast = AstValue::Variable(Name::new("episode"));
        assert_eq!(flatten(ast), Value::Variable("episode".to_string()));
    }

    #[test]
    fn literals_flatten_recursively() {
        let ast = AstValue::List(vec![
            AstValue::Number(3.into()),
            AstValue::Object(
                [
                    (Name::new("unit"), AstValue::Enum(Name::new("METER"))),
                    (Name::new("amount"), AstValue::Variable(Name::new("amount"))),
                ]
                .into_iter()
                .collect(),
            ),
        ]);
        assert_eq!(
            flatten(ast),
            Value::List(vec![
                Value::Int(3),
                Value::Object(btreemap! {
                    "unit".to_string() => Value::from("METER"),
                    "amount".to_string() => Value::Variable("amount".to_string()),
                }),
            ])
        );
    }

    #[test]
    fn numbers_split_by_signedness() {
        assert_eq!(flatten(AstValue::Number((-2i64).into())), Value::Int(-2));
        assert_eq!(
            flatten(AstValue::Number(u64::MAX.into())),
            Value::Uint(u64::MAX)
        );
        let float = serde_json::Number::from_f64(1.25).unwrap();
        assert_eq!(flatten(AstValue::Number(float)), Value::Float(1.25));
    }

    #[test]
    fn const_defaults_flatten_without_variables() {
        let ast = ConstValue::Object(
            [(Name::new("limit"), ConstValue::Number(10.into()))]
                .into_iter()
                .collect(),
        );
        assert_eq!(
            flatten_const(ast),
            Value::Object(btreemap! {
                "limit".to_string() => Value::Int(10),
            })
        );
    }
}
