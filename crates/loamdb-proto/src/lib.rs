//! LoamDB wire protocol types and serialization.
//!
//! This crate defines the binary protocol spoken between the LoamDB client
//! driver and a server, using rkyv for zero-copy serialization.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types for query arguments and results
//! - [`cardinality`] - Declared result cardinality and enforcement
//! - [`message`] - Request/response message wrappers and session state
//! - [`result`] - Row-set result types
//! - [`handshake`] - Connection negotiation and authentication
//! - [`framing`] - Length-prefix framing
//! - [`codec`] - Frame-level encode/decode entry points
//! - [`error`] - Protocol error types

pub mod cardinality;
pub mod codec;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod message;
pub mod result;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root.
pub use cardinality::{Cardinality, CardinalityError};
pub use handshake::{Hello, HelloResponse};
pub use message::{
    error_codes, Isolation, Operation, QuerySpec, Request, Response, ResponsePayload,
    SessionState, Status, TxOptions,
};
pub use result::RowSet;
pub use value::Value;

/// Protocol version for wire compatibility.
///
/// Sent in the hello exchange; connections are rejected when client and
/// server disagree.
pub const PROTOCOL_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_carries_protocol_version() {
        let hello = Hello::new("admin", "main");
        assert_eq!(hello.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_query_frame_roundtrip() {
        let request = Request::query(
            1,
            SessionState::default(),
            QuerySpec::new("select User { id, name }", Cardinality::Many),
        );
        let frame = codec::encode_request(&request).unwrap();
        assert_eq!(codec::decode_request(&frame).unwrap(), request);
    }
}
