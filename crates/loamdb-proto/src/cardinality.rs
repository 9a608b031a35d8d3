//! Result cardinality declarations and enforcement.
//!
//! Every query declares how many rows it may legally return. The server
//! echoes rows without inspecting the declaration; enforcement happens on
//! the client side when the result set is decoded.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};
use thiserror::Error;

/// Declared expectation on the number of rows a query may return.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize,
    SerdeDeserialize,
)]
pub enum Cardinality {
    /// The query returns no rows; any returned data is discarded.
    NoResult,
    /// Zero or one row.
    AtMostOne,
    /// Exactly one row.
    ExactlyOne,
    /// Zero or more rows.
    Many,
}

impl Cardinality {
    /// Wire byte for this cardinality.
    pub fn to_byte(self) -> u8 {
        match self {
            Cardinality::NoResult => 0x6e,
            Cardinality::AtMostOne => 0x6f,
            Cardinality::ExactlyOne => 0x41,
            Cardinality::Many => 0x6d,
        }
    }

    /// Parse a cardinality from its wire byte.
    pub fn from_byte(raw: u8) -> Option<Self> {
        match raw {
            0x6e => Some(Cardinality::NoResult),
            0x6f => Some(Cardinality::AtMostOne),
            0x41 => Some(Cardinality::ExactlyOne),
            0x6d => Some(Cardinality::Many),
            _ => None,
        }
    }

    /// Check a row count against this declaration.
    pub fn check(self, rows: usize) -> Result<(), CardinalityError> {
        let ok = match self {
            Cardinality::NoResult | Cardinality::Many => true,
            Cardinality::AtMostOne => rows <= 1,
            Cardinality::ExactlyOne => rows == 1,
        };

        if ok {
            Ok(())
        } else {
            Err(CardinalityError {
                expected: self,
                actual: rows,
            })
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Cardinality::NoResult => "no result",
            Cardinality::AtMostOne => "at most one",
            Cardinality::ExactlyOne => "exactly one",
            Cardinality::Many => "many",
        };
        f.write_str(name)
    }
}

/// A result set's row count does not satisfy the declared cardinality.
#[derive(Debug, Clone, Error)]
#[error("cardinality violation: expected {expected}, got {actual} row(s)")]
pub struct CardinalityError {
    /// The declared cardinality.
    pub expected: Cardinality,
    /// The number of rows actually returned.
    pub actual: usize,
}
