//! Deserialization of [`Value`] back into host types.

use std::collections::BTreeMap;

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, Deserializer, IntoDeserializer, Visitor};
use serde::{Deserialize, forward_to_deserialize_any};

use crate::error::DecodeError;
use crate::value::Value;

/// Converts a [`Value`] into any `Deserialize` type.
pub fn from_value<T: de::DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    T::deserialize(value)
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("any valid driver value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Uint(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

impl<'de> Deserializer<'de> for Value {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Null | Value::Variable(_) => visitor.visit_unit(),
            Value::Int(i) => visitor.visit_i64(i),
            Value::Uint(u) => visitor.visit_u64(u),
            Value::Float(f) => visitor.visit_f64(f),
            Value::String(s) => visitor.visit_string(s),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Bytes(b) => visitor.visit_byte_buf(b),
            Value::List(items) => visitor.visit_seq(SeqDeserializer::new(items.into_iter())),
            Value::Object(map) => visitor.visit_map(MapDeserializer::new(map.into_iter())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Null => visitor.visit_none(),
            value => visitor.visit_some(value),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct enum
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, DecodeError> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;
    use crate::value::to_value;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Character {
        name: String,
        #[serde(rename = "appearsIn")]
        appears_in: Vec<String>,
        #[serde(default)]
        home_planet: Option<String>,
    }

    #[test]
    fn typed_round_trip() {
        #[derive(Debug, Deserialize, PartialEq, serde::Serialize)]
        struct Pair {
            left: i64,
            right: Option<bool>,
        }
        let original = Pair {
            left: -4,
            right: Some(true),
        };
        let value = to_value(&original).unwrap();
        assert_eq!(from_value::<Pair>(value).unwrap(), original);
    }

    #[test]
    fn objects_deserialize_into_structs() {
        let value = Value::Object(btreemap! {
            "name".to_string() => Value::from("Luke"),
            "appearsIn".to_string() => Value::List(vec![Value::from("JEDI")]),
        });
        assert_eq!(
            from_value::<Character>(value).unwrap(),
            Character {
                name: "Luke".to_string(),
                appears_in: vec!["JEDI".to_string()],
                home_planet: None,
            }
        );
    }

    #[test]
    fn null_and_variables_deserialize_as_absent() {
        assert_eq!(from_value::<Option<i64>>(Value::Null).unwrap(), None);
        assert_eq!(from_value::<()>(Value::Variable("x".to_string())).unwrap(), ());
    }

    #[test]
    fn value_round_trips_through_serde_json() {
        // JSON carries no signedness, so only negative integers keep their
        // Int variant on the way back; positives come back as Uint.
        let original = Value::Object(btreemap! {
            "count".to_string() => Value::Int(-3),
            "name".to_string() => Value::from("r2"),
            "tags".to_string() => Value::List(vec![Value::Bool(false), Value::Null]),
        });
        let json = serde_json::to_value(&original).unwrap();
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, original);

        let json = serde_json::to_value(Value::Int(3)).unwrap();
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Uint(3));
    }
}
