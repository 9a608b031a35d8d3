//! Row-to-type mapping.
//!
//! Decoded rows are converted into caller types by field name: the caller
//! asks for its own field names, the configured [`NamingStrategy`] translates
//! them to server attribute names, and [`FromValue`] converts the scalar.
//! Unmapped server fields are ignored; a missing requested field is a
//! mapping error.

use loamdb_proto::{RowSet, Value};

use crate::error::Error;
use crate::naming::NamingStrategy;

/// Convert a wire [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    /// Convert, failing with [`Error::Mapping`] on a type mismatch.
    fn from_value(value: &Value) -> Result<Self, Error>;
}

fn mismatch(expected: &str, value: &Value) -> Error {
    Error::Mapping(format!(
        "cannot convert {} value into {}",
        value.type_name(),
        expected
    ))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, Error> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for i16 {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value.as_i16().ok_or_else(|| mismatch("i16", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value.as_i32().ok_or_else(|| mismatch("i32", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value.as_i64().ok_or_else(|| mismatch("i64", value))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Json(s) => Ok(s.clone()),
            _ => Err(mismatch("string", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value
            .as_bytes()
            .map(|b| b.to_vec())
            .ok_or_else(|| mismatch("bytes", value))
    }
}

impl FromValue for [u8; 16] {
    fn from_value(value: &Value) -> Result<Self, Error> {
        value.as_uuid().copied().ok_or_else(|| mismatch("uuid", value))
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Int64Array(v) => Ok(v.clone()),
            _ => Err(mismatch("array<int64>", value)),
        }
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::StringArray(v) => Ok(v.clone()),
            _ => Err(mismatch("array<string>", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, Error> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// A borrowed view of one result row, with name translation applied on
/// lookup.
pub struct Row<'a> {
    fields: &'a [String],
    values: &'a [Value],
    naming: NamingStrategy,
}

impl<'a> Row<'a> {
    pub(crate) fn new(fields: &'a [String], values: &'a [Value], naming: NamingStrategy) -> Self {
        Self {
            fields,
            values,
            naming,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Server-side field names of this row.
    pub fn field_names(&self) -> &[String] {
        self.fields
    }

    /// Fetch a field by caller-side name, converting it to `T`.
    ///
    /// The name is translated through the naming strategy before lookup.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, Error> {
        let server_name = self.naming.convert(name);
        let idx = self
            .fields
            .iter()
            .position(|f| *f == server_name)
            .ok_or_else(|| {
                Error::Mapping(format!("missing field `{}` in result row", server_name))
            })?;
        T::from_value(&self.values[idx])
    }
}

/// Construct a type from one result row.
///
/// Scalars get a blanket implementation over single-column rows; shaped
/// results implement this by pulling named fields off the [`Row`].
pub trait FromRow: Sized {
    /// Build `Self` from a row, failing with [`Error::Mapping`] when the
    /// row does not carry the required fields.
    fn from_row(row: &Row<'_>) -> Result<Self, Error>;
}

impl<T: FromValue> FromRow for T {
    fn from_row(row: &Row<'_>) -> Result<Self, Error> {
        if row.width() != 1 {
            return Err(Error::Mapping(format!(
                "expected a single-column row, got {} columns",
                row.width()
            )));
        }
        T::from_value(&row.values[0])
    }
}

/// Map every row of a result set into `T`.
pub(crate) fn map_rows<T: FromRow>(rows: &RowSet, naming: NamingStrategy) -> Result<Vec<T>, Error> {
    rows.rows
        .iter()
        .map(|values| T::from_row(&Row::new(&rows.fields, values, naming)))
        .collect()
}
