//! Connection negotiation and authentication messages.
//!
//! A `Hello` is the first frame a client sends after dialing; the server
//! answers with a `HelloResponse` before any request/response traffic.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Client greeting, carrying credentials and the protocol version.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Hello {
    /// Protocol version the client speaks.
    pub protocol_version: u32,
    /// User name to authenticate as.
    pub username: String,
    /// Password, if the server requires one.
    pub password: Option<String>,
    /// Database branch to bind the session to.
    pub branch: String,
    /// Capabilities the client supports.
    pub capabilities: Vec<String>,
}

impl Hello {
    /// Create a greeting for the current protocol version.
    pub fn new(username: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            username: username.into(),
            password: None,
            branch: branch.into(),
            capabilities: vec![],
        }
    }

    /// Attach a password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Advertise a client capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

/// Server reply to a [`Hello`].
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct HelloResponse {
    /// Whether authentication and version negotiation succeeded.
    pub accepted: bool,
    /// Protocol version the server will speak on this connection.
    pub protocol_version: u32,
    /// Server identifier, for logging.
    pub server_id: String,
    /// Capabilities the server supports.
    pub capabilities: Vec<String>,
    /// Rejection reason when `accepted` is false.
    pub error: Option<String>,
}

impl HelloResponse {
    /// Create an accepting response.
    pub fn accept(protocol_version: u32, server_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            protocol_version,
            server_id: server_id.into(),
            capabilities: vec![],
            error: None,
        }
    }

    /// Create a rejecting response.
    pub fn reject(error: impl Into<String>) -> Self {
        Self {
            accepted: false,
            protocol_version: 0,
            server_id: String::new(),
            capabilities: vec![],
            error: Some(error.into()),
        }
    }

    /// Advertise a server capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
}

/// Standard capability identifiers.
pub mod capabilities {
    /// Interactive transactions (begin/commit/rollback).
    pub const TRANSACTIONS: &str = "transactions";
    /// Session-scoped global variables.
    pub const GLOBALS: &str = "globals";
    /// Batched statement execution.
    pub const BATCH: &str = "batch";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_builder() {
        let hello = Hello::new("admin", "main")
            .with_password("secret")
            .with_capability(capabilities::TRANSACTIONS);

        assert_eq!(hello.protocol_version, crate::PROTOCOL_VERSION);
        assert_eq!(hello.username, "admin");
        assert_eq!(hello.password.as_deref(), Some("secret"));
        assert_eq!(hello.branch, "main");
        assert_eq!(hello.capabilities, vec!["transactions".to_string()]);
    }

    #[test]
    fn test_accept_and_reject() {
        let ok = HelloResponse::accept(1, "srv-1").with_capability(capabilities::GLOBALS);
        assert!(ok.accepted);
        assert!(ok.error.is_none());
        assert_eq!(ok.capabilities, vec!["globals".to_string()]);

        let bad = HelloResponse::reject("authentication failed");
        assert!(!bad.accepted);
        assert_eq!(bad.error.as_deref(), Some("authentication failed"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let hello = Hello::new("reader", "analytics").with_password("pw");
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&hello).unwrap();
        let archived = rkyv::access::<ArchivedHello, rkyv::rancor::Error>(&bytes).unwrap();
        let back: Hello = rkyv::deserialize::<Hello, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(hello, back);

        let resp = HelloResponse::accept(1, "srv").with_capability(capabilities::TRANSACTIONS);
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&resp).unwrap();
        let archived =
            rkyv::access::<ArchivedHelloResponse, rkyv::rancor::Error>(&bytes).unwrap();
        let back: HelloResponse =
            rkyv::deserialize::<HelloResponse, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(resp, back);
    }
}
