//! Serialization of arbitrary host types into [`Value`].
//!
//! Field naming, skipping and embedded-struct promotion all come from serde
//! attributes on the source type; this serializer only decides which value
//! variant each primitive lands in. Numbers are widened to their canonical
//! wire widths here.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser::{self, Serializer};

use crate::error::EncodeError;
use crate::value::Value;

/// Converts any `Serialize` type into a [`Value`].
///
/// Maps keyed by anything but strings are rejected with
/// [`EncodeError::KeyMustBeAString`].
pub fn to_value<T: Serialize>(value: T) -> Result<Value, EncodeError> {
    value.serialize(ValueSerializer)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::List(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            // A deferred variable has no host representation of its own.
            Value::Variable(_) => serializer.serialize_unit(),
        }
    }
}

struct ValueSerializer;

impl Serializer for ValueSerializer {
    type Ok = Value;
    type Error = EncodeError;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, EncodeError> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Value, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Value, EncodeError> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<Value, EncodeError> {
        Ok(Value::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, EncodeError> {
        self.serialize_u64(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<Value, EncodeError> {
        self.serialize_u64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Value, EncodeError> {
        self.serialize_u64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Value, EncodeError> {
        Ok(Value::Uint(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, EncodeError> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Value, EncodeError> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, EncodeError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, EncodeError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, EncodeError> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value, EncodeError> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, EncodeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, EncodeError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, EncodeError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, EncodeError> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, EncodeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, EncodeError> {
        let mut map = BTreeMap::new();
        map.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, EncodeError> {
        Ok(SerializeVec {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, EncodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, EncodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, EncodeError> {
        Ok(SerializeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, EncodeError> {
        Ok(SerializeMap {
            map: BTreeMap::new(),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, EncodeError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, EncodeError> {
        Ok(SerializeStructVariant {
            variant,
            map: BTreeMap::new(),
        })
    }
}

struct SerializeVec {
    items: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        Ok(Value::List(self.items))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, EncodeError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, EncodeError> {
        ser::SerializeSeq::end(self)
    }
}

struct SerializeTupleVariant {
    variant: &'static str,
    items: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.items.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        let mut map = BTreeMap::new();
        map.insert(self.variant.to_string(), Value::List(self.items));
        Ok(Value::Object(map))
    }
}

struct SerializeMap {
    map: BTreeMap<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), EncodeError> {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let key = self
            .next_key
            .take()
            .expect("serialize_value called before serialize_key");
        self.map.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.map
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        Ok(Value::Object(self.map))
    }
}

struct SerializeStructVariant {
    variant: &'static str,
    map: BTreeMap<String, Value>,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = EncodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), EncodeError> {
        self.map
            .insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, EncodeError> {
        let mut map = BTreeMap::new();
        map.insert(self.variant.to_string(), Value::Object(self.map));
        Ok(Value::Object(map))
    }
}

/// Map keys must serialize to strings; everything else is rejected.
struct MapKeySerializer;

fn key_must_be_a_string<T>() -> Result<T, EncodeError> {
    Err(EncodeError::KeyMustBeAString)
}

impl Serializer for MapKeySerializer {
    type Ok = String;
    type Error = EncodeError;

    type SerializeSeq = ser::Impossible<String, EncodeError>;
    type SerializeTuple = ser::Impossible<String, EncodeError>;
    type SerializeTupleStruct = ser::Impossible<String, EncodeError>;
    type SerializeTupleVariant = ser::Impossible<String, EncodeError>;
    type SerializeMap = ser::Impossible<String, EncodeError>;
    type SerializeStruct = ser::Impossible<String, EncodeError>;
    type SerializeStructVariant = ser::Impossible<String, EncodeError>;

    fn serialize_bool(self, _v: bool) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_i8(self, _v: i8) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_i16(self, _v: i16) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_i32(self, _v: i32) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_i64(self, _v: i64) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_u8(self, _v: u8) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_u16(self, _v: u16) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_u32(self, _v: u32) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_u64(self, _v: u64) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_f32(self, _v: f32) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_f64(self, _v: f64) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_char(self, v: char) -> Result<String, EncodeError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, EncodeError> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_none(self) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_unit(self) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, EncodeError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, EncodeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, EncodeError> {
        key_must_be_a_string()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, EncodeError> {
        key_must_be_a_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use maplit::btreemap;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    use super::*;
    use crate::error::EncodeError;

    #[derive(Serialize)]
    struct Character {
        name: String,
        #[serde(rename = "appearsIn")]
        appears_in: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        home_planet: Option<String>,
    }

    #[test]
    fn primitives_use_canonical_widths() {
        assert_eq!(to_value(1i8).unwrap(), Value::Int(1));
        assert_eq!(to_value(1i32).unwrap(), Value::Int(1));
        assert_eq!(to_value(1u8).unwrap(), Value::Uint(1));
        assert_eq!(to_value(1.5f32).unwrap(), Value::Float(1.5));
        assert_eq!(to_value("hi").unwrap(), Value::String("hi".to_string()));
        assert_eq!(to_value(true).unwrap(), Value::Bool(true));
        assert_eq!(to_value(()).unwrap(), Value::Null);
        assert_eq!(to_value(None::<i32>).unwrap(), Value::Null);
    }

    #[test]
    fn structs_collapse_to_objects() {
        let value = to_value(Character {
            name: "R2-D2".to_string(),
            appears_in: vec!["NEWHOPE".to_string()],
            home_planet: None,
        })
        .unwrap();
        assert_eq!(
            value,
            Value::Object(btreemap! {
                "name".to_string() => Value::from("R2-D2"),
                "appearsIn".to_string() => Value::List(vec![Value::from("NEWHOPE")]),
            })
        );
    }

    #[test]
    fn nested_containers_recurse() {
        let mut inner = BTreeMap::new();
        inner.insert("a".to_string(), vec![1i64, 2]);
        let value = to_value(&inner).unwrap();
        assert_eq!(
            value,
            Value::Object(btreemap! {
                "a".to_string() => Value::List(vec![Value::Int(1), Value::Int(2)]),
            })
        );
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = HashMap::new();
        map.insert(1i32, "one");
        assert_eq!(to_value(&map), Err(EncodeError::KeyMustBeAString));
    }

    #[test]
    fn unit_variants_become_strings() {
        #[derive(Serialize)]
        enum Episode {
            #[serde(rename = "NEWHOPE")]
            NewHope,
        }
        assert_eq!(to_value(Episode::NewHope).unwrap(), Value::from("NEWHOPE"));
    }

    #[test]
    fn value_serializes_through_itself() {
        let original = Value::Object(btreemap! {
            "bytes".to_string() => Value::Bytes(vec![0, 1]),
            "count".to_string() => Value::Uint(7),
        });
        assert_eq!(to_value(&original).unwrap(), original);
    }
}
