//! Result set types for query responses.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::cardinality::{Cardinality, CardinalityError};
use crate::value::Value;

/// A decoded result set: ordered field names plus row tuples.
///
/// Every row has exactly one value per field, in field order. The server
/// reports attribute names in its own convention; name translation is a
/// client concern.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct RowSet {
    /// Field names, in column order.
    pub fields: Vec<String>,
    /// Row tuples, each parallel to `fields`.
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Create an empty result set with the given field names.
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    /// Create a result set holding a single unnamed scalar per row.
    pub fn scalar(values: Vec<Value>) -> Self {
        Self {
            fields: vec!["value".to_string()],
            rows: values.into_iter().map(|v| vec![v]).collect(),
        }
    }

    /// Append a row. The row length must match the field count.
    pub fn push_row(&mut self, row: Vec<Value>) -> &mut Self {
        debug_assert_eq!(row.len(), self.fields.len());
        self.rows.push(row);
        self
    }

    /// Builder-style [`push_row`](Self::push_row).
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.push_row(row);
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a field by its server-side name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Value at a row/field position.
    pub fn get(&self, row: usize, field: &str) -> Option<&Value> {
        let idx = self.field_index(field)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Validate the row count against a declared cardinality.
    pub fn expect(&self, cardinality: Cardinality) -> Result<(), CardinalityError> {
        cardinality.check(self.rows.len())
    }

    /// Consume the set, validating cardinality and yielding the single row
    /// if one exists.
    ///
    /// `ExactlyOne` yields `Some(row)`; `AtMostOne` yields `Some(row)` or
    /// `None`; a violating row count is an error.
    pub fn into_single(
        mut self,
        cardinality: Cardinality,
    ) -> Result<Option<Vec<Value>>, CardinalityError> {
        self.expect(cardinality)?;
        Ok(self.rows.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> RowSet {
        RowSet::new(vec!["id".into(), "name".into()])
            .with_row(vec![Value::Int64(1), Value::String("Alice".into())])
            .with_row(vec![Value::Int64(2), Value::String("Bob".into())])
    }

    #[test]
    fn test_field_lookup() {
        let rows = names();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.get(1, "name"), Some(&Value::String("Bob".into())));
        assert_eq!(rows.get(0, "missing"), None);
        assert_eq!(rows.get(5, "id"), None);
    }

    #[test]
    fn test_expect_cardinality() {
        let rows = names();
        assert!(rows.expect(Cardinality::Many).is_ok());
        assert!(rows.expect(Cardinality::ExactlyOne).is_err());
        assert!(rows.expect(Cardinality::AtMostOne).is_err());
    }

    #[test]
    fn test_into_single() {
        let one = RowSet::scalar(vec![Value::String("x".into())]);
        let row = one.into_single(Cardinality::ExactlyOne).unwrap().unwrap();
        assert_eq!(row, vec![Value::String("x".into())]);

        let none = RowSet::scalar(vec![]);
        assert_eq!(none.into_single(Cardinality::AtMostOne).unwrap(), None);

        let empty = RowSet::scalar(vec![]);
        assert!(empty.into_single(Cardinality::ExactlyOne).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let rows = names();
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&rows).unwrap();
        let archived = rkyv::access::<ArchivedRowSet, rkyv::rancor::Error>(&bytes).unwrap();
        let back: RowSet = rkyv::deserialize::<RowSet, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(rows, back);
    }
}
