//! Frame-level encode/decode entry points.
//!
//! Every frame payload starts with a one-byte message kind followed by the
//! rkyv-serialized body, so a receiver can dispatch without guessing at the
//! archived type. Both directions are provided: the client encodes requests
//! and decodes responses, a server (or test double) does the reverse.

use crate::cardinality::Cardinality;
use crate::framing::{decode_frame, encode_frame};
use crate::handshake::{ArchivedHello, ArchivedHelloResponse, Hello, HelloResponse};
use crate::message::{
    ArchivedRequest, ArchivedResponse, Request, Response, ResponsePayload, Status,
};
use crate::result::RowSet;
use crate::Error;

/// Message kind tags, the first byte of every frame payload.
pub mod kind {
    /// Client greeting.
    pub const HELLO: u8 = 0x48;
    /// Server reply to a greeting.
    pub const HELLO_REPLY: u8 = 0x68;
    /// Client request.
    pub const REQUEST: u8 = 0x52;
    /// Server response.
    pub const RESPONSE: u8 = 0x72;
}

/// Peek at the message kind of a framed buffer without decoding the body.
pub fn peek_kind(frame: &[u8]) -> Result<u8, Error> {
    let payload = decode_frame(frame)?;
    payload
        .first()
        .copied()
        .ok_or_else(|| Error::InvalidMessage("empty frame payload".to_string()))
}

fn encode_tagged(tag: u8, body: &[u8]) -> Result<Vec<u8>, Error> {
    let mut payload = Vec::with_capacity(1 + body.len());
    payload.push(tag);
    payload.extend_from_slice(body);
    Ok(encode_frame(&payload)?.to_vec())
}

/// Strip the frame and kind tag, yielding the rkyv body in aligned storage.
fn tagged_body(frame: &[u8], expected: u8) -> Result<rkyv::util::AlignedVec, Error> {
    let payload = decode_frame(frame)?;
    let (tag, body) = payload
        .split_first()
        .ok_or_else(|| Error::InvalidMessage("empty frame payload".to_string()))?;
    if *tag != expected {
        return Err(Error::InvalidMessage(format!(
            "unexpected message kind {:#04x}, expected {:#04x}",
            tag, expected
        )));
    }

    // The tag offsets the body by one byte, so realign before rkyv access.
    let mut aligned = rkyv::util::AlignedVec::new();
    aligned.extend_from_slice(body);
    Ok(aligned)
}

/// Encode a request into a framed buffer.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, Error> {
    let body = rkyv::to_bytes::<rkyv::rancor::Error>(request)
        .map_err(|e| Error::Serialization(format!("failed to serialize request: {}", e)))?;
    encode_tagged(kind::REQUEST, &body)
}

/// Decode a framed request (server side).
pub fn decode_request(frame: &[u8]) -> Result<Request, Error> {
    let body = tagged_body(frame, kind::REQUEST)?;
    let archived = rkyv::access::<ArchivedRequest, rkyv::rancor::Error>(&body)
        .map_err(|e| Error::Deserialization(format!("failed to access request: {}", e)))?;
    rkyv::deserialize::<Request, rkyv::rancor::Error>(archived)
        .map_err(|e| Error::Deserialization(format!("failed to deserialize request: {}", e)))
}

/// Encode a response into a framed buffer.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, Error> {
    let body = rkyv::to_bytes::<rkyv::rancor::Error>(response)
        .map_err(|e| Error::Serialization(format!("failed to serialize response: {}", e)))?;
    encode_tagged(kind::RESPONSE, &body)
}

/// Decode a framed response.
pub fn decode_response(frame: &[u8]) -> Result<Response, Error> {
    let body = tagged_body(frame, kind::RESPONSE)?;
    let archived = rkyv::access::<ArchivedResponse, rkyv::rancor::Error>(&body)
        .map_err(|e| Error::Deserialization(format!("failed to access response: {}", e)))?;
    rkyv::deserialize::<Response, rkyv::rancor::Error>(archived)
        .map_err(|e| Error::Deserialization(format!("failed to deserialize response: {}", e)))
}

/// Encode a client greeting into a framed buffer.
pub fn encode_hello(hello: &Hello) -> Result<Vec<u8>, Error> {
    let body = rkyv::to_bytes::<rkyv::rancor::Error>(hello)
        .map_err(|e| Error::Serialization(format!("failed to serialize hello: {}", e)))?;
    encode_tagged(kind::HELLO, &body)
}

/// Decode a framed client greeting (server side).
pub fn decode_hello(frame: &[u8]) -> Result<Hello, Error> {
    let body = tagged_body(frame, kind::HELLO)?;
    let archived = rkyv::access::<ArchivedHello, rkyv::rancor::Error>(&body)
        .map_err(|e| Error::Deserialization(format!("failed to access hello: {}", e)))?;
    rkyv::deserialize::<Hello, rkyv::rancor::Error>(archived)
        .map_err(|e| Error::Deserialization(format!("failed to deserialize hello: {}", e)))
}

/// Encode a greeting response into a framed buffer.
pub fn encode_hello_response(response: &HelloResponse) -> Result<Vec<u8>, Error> {
    let body = rkyv::to_bytes::<rkyv::rancor::Error>(response)
        .map_err(|e| Error::Serialization(format!("failed to serialize hello response: {}", e)))?;
    encode_tagged(kind::HELLO_REPLY, &body)
}

/// Decode a framed greeting response.
pub fn decode_hello_response(frame: &[u8]) -> Result<HelloResponse, Error> {
    let body = tagged_body(frame, kind::HELLO_REPLY)?;
    let archived = rkyv::access::<ArchivedHelloResponse, rkyv::rancor::Error>(&body)
        .map_err(|e| Error::Deserialization(format!("failed to access hello response: {}", e)))?;
    rkyv::deserialize::<HelloResponse, rkyv::rancor::Error>(archived).map_err(|e| {
        Error::Deserialization(format!("failed to deserialize hello response: {}", e))
    })
}

/// Decode a framed response and extract its rows, validating the declared
/// cardinality.
///
/// A `Complete` payload decodes as an empty row set, so no-result statements
/// flow through the same path. Server errors and unexpected payloads are
/// surfaced as [`Error::InvalidMessage`].
pub fn decode_rows(frame: &[u8], cardinality: Cardinality) -> Result<RowSet, Error> {
    let response = decode_response(frame)?;
    match response.status {
        Status::Ok => {}
        Status::Error { code, message } => {
            return Err(Error::InvalidMessage(format!(
                "server error {}: {}",
                code, message
            )))
        }
    }

    let rows = match response.payload {
        ResponsePayload::Rows(rows) => rows,
        ResponsePayload::Complete { .. } => RowSet::new(vec![]),
        other => {
            return Err(Error::InvalidMessage(format!(
                "expected rows payload, got {:?}",
                other
            )))
        }
    };

    rows.expect(cardinality)
        .map_err(|e| Error::InvalidMessage(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{QuerySpec, SessionState};
    use crate::value::Value;

    #[test]
    fn test_request_roundtrip() {
        let request = Request::query(
            7,
            SessionState::default(),
            QuerySpec::new("select Post { title }", Cardinality::Many)
                .with_argument("limit", 10i64),
        );

        let frame = encode_request(&request).unwrap();
        assert_eq!(peek_kind(&frame).unwrap(), kind::REQUEST);
        let back = decode_request(&frame).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn test_response_roundtrip() {
        let rows = RowSet::new(vec!["title".into()])
            .with_row(vec![Value::String("first".into())])
            .with_row(vec![Value::String("second".into())]);
        let response = Response::rows_ok(7, rows);

        let frame = encode_response(&response).unwrap();
        let back = decode_response(&frame).unwrap();
        assert_eq!(response, back);
    }

    #[test]
    fn test_hello_roundtrip() {
        let hello = Hello::new("app", "main").with_password("pw");
        let frame = encode_hello(&hello).unwrap();
        assert_eq!(peek_kind(&frame).unwrap(), kind::HELLO);
        assert_eq!(decode_hello(&frame).unwrap(), hello);

        let resp = HelloResponse::accept(crate::PROTOCOL_VERSION, "srv");
        let frame = encode_hello_response(&resp).unwrap();
        assert_eq!(decode_hello_response(&frame).unwrap(), resp);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let frame = encode_request(&Request::ping(1)).unwrap();
        assert!(decode_response(&frame).is_err());
        assert!(decode_hello(&frame).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_response(&[1, 2, 3]).is_err());

        let frame = encode_response(&Response::pong(1)).unwrap();
        // Truncating the frame breaks the declared length.
        assert!(decode_response(&frame[..frame.len() - 1]).is_err());
    }

    #[test]
    fn test_decode_rows_cardinality() {
        let one = Response::rows_ok(1, RowSet::scalar(vec![Value::String("x".into())]));
        let frame = encode_response(&one).unwrap();
        assert_eq!(
            decode_rows(&frame, Cardinality::ExactlyOne).unwrap().len(),
            1
        );

        let empty = Response::rows_ok(1, RowSet::scalar(vec![]));
        let frame = encode_response(&empty).unwrap();
        assert!(decode_rows(&frame, Cardinality::ExactlyOne).is_err());
        assert!(decode_rows(&frame, Cardinality::Many).is_ok());
    }

    #[test]
    fn test_decode_rows_complete_payload() {
        let frame = encode_response(&Response::complete_ok(1, 3)).unwrap();
        let rows = decode_rows(&frame, Cardinality::NoResult).unwrap();
        assert!(rows.is_empty());
    }
}
