// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! OTLP attribute values.
//!
//! [`AttributeValue`] is a closed sum type: exactly one variant is ever set,
//! and the serde representation is the OTLP/JSON one-of object
//! (`{"stringValue": "..."}`, `{"intValue": 3}`, ...). The "unset" state is
//! expressed by the owner as `Option<AttributeValue>::None`.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "boolValue")]
    Bool(bool),
    #[serde(rename = "intValue", deserialize_with = "serde_number::deserialize")]
    Int(i64),
    #[serde(rename = "doubleValue", with = "serde_double")]
    Double(f64),
    #[serde(rename = "bytesValue", with = "serde_base64")]
    Bytes(Vec<u8>),
    #[serde(rename = "arrayValue", with = "serde_values")]
    Array(Vec<AttributeValue>),
    #[serde(rename = "kvlistValue", with = "serde_values")]
    KvList(Vec<KeyValue>),
}

/// A single attribute. Duplicate keys within one attribute set are passed
/// through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AttributeValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl AttributeValue {
    /// Wraps the `Display` rendering of `value` as a string attribute.
    pub fn display(value: &impl fmt::Display) -> Self {
        AttributeValue::String(value.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! downcast_scalar {
    ($any:expr, $($t:ty),+ $(,)?) => {
        $(
            if let Some(v) = $any.downcast_ref::<$t>() {
                return AttributeValue::from(v.clone());
            }
        )+
    };
}

/// Converts an arbitrary value into an [`AttributeValue`].
///
/// Strings, integers, floats and booleans map onto their matching variant.
/// Anything else becomes a string holding its `Debug` rendering, so the
/// conversion never fails.
pub fn to_attribute_value<T: Any + fmt::Debug>(value: &T) -> AttributeValue {
    let any = value as &dyn Any;
    if let Some(v) = any.downcast_ref::<AttributeValue>() {
        return v.clone();
    }
    downcast_scalar!(
        any,
        String,
        &'static str,
        bool,
        i8,
        i16,
        i32,
        i64,
        isize,
        u8,
        u16,
        u32,
        u64,
        usize,
        f32,
        f64,
    );
    AttributeValue::String(format!("{value:?}"))
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

macro_rules! impl_from_lossless_int {
    ($($t:ty),+) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(value: $t) -> Self {
                    AttributeValue::Int(i64::from(value))
                }
            }
        )+
    };
}

impl_from_lossless_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<isize> for AttributeValue {
    fn from(value: isize) -> Self {
        AttributeValue::Int(value as i64)
    }
}

// Values above i64::MAX have no Int64 representation; keep them exact as text.
macro_rules! impl_from_wide_unsigned {
    ($($t:ty),+) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(value: $t) -> Self {
                    match i64::try_from(value) {
                        Ok(v) => AttributeValue::Int(v),
                        Err(_) => AttributeValue::String(value.to_string()),
                    }
                }
            }
        )+
    };
}

impl_from_wide_unsigned!(u64, usize);

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Double(f64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        AttributeValue::Bytes(value.to_vec())
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(values: Vec<AttributeValue>) -> Self {
        AttributeValue::Array(values)
    }
}

impl From<Vec<KeyValue>> for AttributeValue {
    fn from(values: Vec<KeyValue>) -> Self {
        AttributeValue::KvList(values)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => AttributeValue::String("null".to_string()),
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    AttributeValue::Int(v)
                } else if let Some(v) = n.as_u64() {
                    AttributeValue::from(v)
                } else {
                    AttributeValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => AttributeValue::String(s),
            Value::Array(values) => {
                AttributeValue::Array(values.into_iter().map(AttributeValue::from).collect())
            }
            Value::Object(map) => AttributeValue::KvList(
                map.into_iter()
                    .map(|(key, value)| KeyValue::new(key, value))
                    .collect(),
            ),
        }
    }
}

// Base64 encoding for bytesValue.
pub(crate) mod serde_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// OTLP/JSON spells non-finite doubles as strings.
pub(crate) mod serde_double {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DoubleRepr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else if value.is_infinite() {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match DoubleRepr::deserialize(deserializer)? {
            DoubleRepr::Number(v) => Ok(v),
            DoubleRepr::Text(s) => match s.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => other.parse().map_err(serde::de::Error::custom),
            },
        }
    }
}

// Integers that may arrive either as JSON numbers or as decimal strings.
pub(crate) mod serde_number {
    use serde::{Deserialize, Deserializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString<T> {
        Number(T),
        Text(String),
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        <T as FromStr>::Err: Display,
    {
        match NumberOrString::<T>::deserialize(deserializer)? {
            NumberOrString::Number(v) => Ok(v),
            NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

// `{"values": [...]}` wrapper shared by arrayValue and kvlistValue.
pub(crate) mod serde_values {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct ValuesRef<'a, T> {
        values: &'a [T],
    }

    #[derive(Deserialize)]
    struct ValuesOwned<T> {
        #[serde(default = "Vec::new")]
        values: Vec<T>,
    }

    pub fn serialize<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        ValuesRef { values }.serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        ValuesOwned::deserialize(deserializer).map(|wrapper| wrapper.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Endpoint {
        host: &'static str,
        port: u16,
    }

    #[test]
    fn test_to_attribute_value_scalars() {
        assert_eq!(
            to_attribute_value(&"john_doe".to_string()),
            AttributeValue::String("john_doe".to_string())
        );
        assert_eq!(
            to_attribute_value(&"static"),
            AttributeValue::String("static".to_string())
        );
        assert_eq!(to_attribute_value(&3_i32), AttributeValue::Int(3));
        assert_eq!(to_attribute_value(&3_i64), AttributeValue::Int(3));
        assert_eq!(to_attribute_value(&30.5_f64), AttributeValue::Double(30.5));
        assert_eq!(to_attribute_value(&true), AttributeValue::Bool(true));
    }

    #[test]
    fn test_to_attribute_value_falls_back_to_debug() {
        let endpoint = Endpoint {
            host: "localhost",
            port: 4318,
        };
        assert_eq!(
            to_attribute_value(&endpoint),
            AttributeValue::String("Endpoint { host: \"localhost\", port: 4318 }".to_string())
        );
        assert_eq!(
            to_attribute_value(&Some(1)),
            AttributeValue::String("Some(1)".to_string())
        );
    }

    #[test]
    fn test_to_attribute_value_passes_attribute_values_through() {
        let value = AttributeValue::Array(vec![AttributeValue::Int(1)]);
        assert_eq!(to_attribute_value(&value), value);
    }

    #[test]
    fn test_unsigned_beyond_i64_becomes_string() {
        assert_eq!(AttributeValue::from(42_u64), AttributeValue::Int(42));
        assert_eq!(
            AttributeValue::from(u64::MAX),
            AttributeValue::String("18446744073709551615".to_string())
        );
    }

    #[test]
    fn test_from_json_value() {
        let value = AttributeValue::from(json!({
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", null],
        }));
        let AttributeValue::KvList(entries) = value else {
            panic!("expected kvlist");
        };
        assert_eq!(entries.len(), 3);
        let find = |key: &str| {
            entries
                .iter()
                .find(|kv| kv.key == key)
                .map(|kv| kv.value.clone())
        };
        assert_eq!(find("count"), Some(AttributeValue::Int(3)));
        assert_eq!(find("ratio"), Some(AttributeValue::Double(0.5)));
        assert_eq!(
            find("tags"),
            Some(AttributeValue::Array(vec![
                AttributeValue::String("a".to_string()),
                AttributeValue::String("null".to_string()),
            ]))
        );
    }

    #[test]
    fn test_serialize_one_of() {
        let cases = [
            (AttributeValue::from("x"), json!({"stringValue": "x"})),
            (AttributeValue::from(false), json!({"boolValue": false})),
            (AttributeValue::from(7), json!({"intValue": 7})),
            (AttributeValue::from(1.25), json!({"doubleValue": 1.25})),
            (
                AttributeValue::from(&b"hi"[..]),
                json!({"bytesValue": "aGk="}),
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(serde_json::to_value(&value).unwrap(), expected);
        }
    }

    #[test]
    fn test_serialize_nested() {
        let value = AttributeValue::KvList(vec![
            KeyValue::new("ids", vec![AttributeValue::from(1), AttributeValue::from(2)]),
            KeyValue::new("name", "svc"),
        ]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({
                "kvlistValue": {
                    "values": [
                        {"key": "ids", "value": {"arrayValue": {"values": [
                            {"intValue": 1}, {"intValue": 2}
                        ]}}},
                        {"key": "name", "value": {"stringValue": "svc"}}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_non_finite_doubles() {
        assert_eq!(
            serde_json::to_value(AttributeValue::Double(f64::INFINITY)).unwrap(),
            json!({"doubleValue": "Infinity"})
        );
        assert_eq!(
            serde_json::to_value(AttributeValue::Double(f64::NEG_INFINITY)).unwrap(),
            json!({"doubleValue": "-Infinity"})
        );
        let nan: AttributeValue =
            serde_json::from_value(json!({"doubleValue": "NaN"})).unwrap();
        assert!(nan.as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_deserialize_lenient_int_and_double() {
        let from_string: AttributeValue =
            serde_json::from_value(json!({"intValue": "-12"})).unwrap();
        assert_eq!(from_string, AttributeValue::Int(-12));

        let from_int: AttributeValue =
            serde_json::from_value(json!({"doubleValue": 30})).unwrap();
        assert_eq!(from_int, AttributeValue::Double(30.0));
    }

    #[test]
    fn test_deserialize_rejects_two_variants() {
        let result: Result<AttributeValue, _> =
            serde_json::from_value(json!({"stringValue": "a", "intValue": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_empty_array_value() {
        let value: AttributeValue = serde_json::from_value(json!({"arrayValue": {}})).unwrap();
        assert_eq!(value, AttributeValue::Array(vec![]));
    }

    proptest! {
        #[test]
        fn prop_strings_map_to_string_variant(s in ".*") {
            prop_assert_eq!(to_attribute_value(&s), AttributeValue::String(s.clone()));
        }

        #[test]
        fn prop_i64_maps_to_int_variant(v in any::<i64>()) {
            prop_assert_eq!(to_attribute_value(&v), AttributeValue::Int(v));
        }

        #[test]
        fn prop_i32_maps_to_int_variant(v in any::<i32>()) {
            prop_assert_eq!(to_attribute_value(&v), AttributeValue::Int(i64::from(v)));
        }

        #[test]
        fn prop_f64_maps_to_double_variant(v in proptest::num::f64::NORMAL) {
            prop_assert_eq!(to_attribute_value(&v), AttributeValue::Double(v));
        }

        #[test]
        fn prop_bool_maps_to_bool_variant(v in any::<bool>()) {
            prop_assert_eq!(to_attribute_value(&v), AttributeValue::Bool(v));
        }

        #[test]
        fn prop_other_types_map_to_debug_string(v in any::<(u8, char)>()) {
            prop_assert_eq!(to_attribute_value(&v), AttributeValue::String(format!("{v:?}")));
        }
    }
}
