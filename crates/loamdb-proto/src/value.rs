//! Runtime value types for query arguments and results.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A runtime value that can cross the wire in either direction.
///
/// Covers the scalar types the server understands plus typed arrays.
/// Arrays are monomorphic (e.g. `Int64Array`) rather than a recursive
/// `Array(Vec<Value>)` to keep the rkyv layout non-recursive.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    /// Span of time in microseconds.
    Duration(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
    /// JSON document, stored as its string encoding.
    Json(String),
    /// Array of 64-bit integers.
    Int64Array(Vec<i64>),
    /// Array of 64-bit floats.
    Float64Array(Vec<f64>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of UUIDs.
    UuidArray(Vec<[u8; 16]>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i16.
    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Value::Int16(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as i32, widening from smaller integers.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            Value::Int16(i) => Some(*i as i32),
            _ => None,
        }
    }

    /// Try to get as i64, widening from smaller integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(*i as i64),
            Value::Int16(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as f64, widening from f32.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Float32(f) => Some(*f as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as timestamp (microseconds since epoch).
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get as UUID.
    pub fn as_uuid(&self) -> Option<&[u8; 16]> {
        match self {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    /// Try to get the raw JSON text.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Parse a JSON value into a structured document.
    ///
    /// Returns `None` for non-JSON values and for JSON text that does not
    /// parse; the raw text is still available via [`as_json`](Self::as_json).
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Json(j) => serde_json::from_str(j).ok(),
            _ => None,
        }
    }

    /// Name of this value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Int64Array(_) => "array<int64>",
            Value::Float64Array(_) => "array<float64>",
            Value::StringArray(_) => "array<string>",
            Value::UuidArray(_) => "array<uuid>",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Int64Array(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Float64Array(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int16(7).as_i64(), Some(7));
        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Float32(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Json("{}".into()).as_json(), Some("{}"));
        assert_eq!(Value::String("x".into()).as_i64(), None);
    }

    #[test]
    fn test_conversions() {
        let v: Value = 42i64.into();
        assert_eq!(v, Value::Int64(42));

        let v: Value = "hello".into();
        assert_eq!(v, Value::String("hello".into()));

        let v: Value = None::<i64>.into();
        assert_eq!(v, Value::Null);

        let v: Value = vec![1i64, 2, 3].into();
        assert_eq!(v, Value::Int64Array(vec![1, 2, 3]));
    }

    #[test]
    fn test_json_document() {
        let doc = serde_json::json!({"tags": ["a", "b"], "count": 2});
        let v: Value = doc.clone().into();
        assert_eq!(v.to_json(), Some(doc));

        assert_eq!(Value::Json("not json".into()).to_json(), None);
        assert_eq!(Value::Int64(1).to_json(), None);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let values = vec![
            Value::Null,
            Value::Bool(false),
            Value::Int16(-3),
            Value::Int32(-42),
            Value::Int64(i64::MIN),
            Value::Float64(std::f64::consts::E),
            Value::String("hello world".into()),
            Value::Bytes(vec![0, 1, 254, 255]),
            Value::Timestamp(1754524800_000_000),
            Value::Duration(86_400_000_000),
            Value::Uuid([7u8; 16]),
            Value::Json(r#"{"a":[1,2]}"#.into()),
            Value::StringArray(vec!["a".into(), "b".into()]),
        ];

        for value in values {
            let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&value).unwrap();
            let archived = rkyv::access::<ArchivedValue, rkyv::rancor::Error>(&bytes).unwrap();
            let back: Value = rkyv::deserialize::<Value, rkyv::rancor::Error>(archived).unwrap();
            assert_eq!(value, back);
        }
    }
}
