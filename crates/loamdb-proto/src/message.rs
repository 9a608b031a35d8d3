//! Request and response message types.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::cardinality::Cardinality;
use crate::result::RowSet;
use crate::value::Value;

/// Session parameters sent with every request.
///
/// The session is an immutable snapshot taken at call time; the server holds
/// no session state between requests.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct SessionState {
    /// Default module for name resolution.
    pub module: String,
    /// Global variable bindings visible to query execution.
    pub globals: Vec<(String, Value)>,
    /// Whether server-side access policies apply to this session.
    pub apply_access_policies: bool,
}

impl SessionState {
    /// Set a global variable, replacing an existing binding of the same name.
    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.globals.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.globals.push((name, value)),
        }
    }

    /// Look up a global variable binding.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            module: "default".to_string(),
            globals: Vec::new(),
            apply_access_policies: true,
        }
    }
}

/// A query to execute, with its declared result cardinality.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct QuerySpec {
    /// Query text, in the server's query language.
    pub text: String,
    /// Named arguments.
    pub arguments: Vec<(String, Value)>,
    /// Declared result cardinality.
    pub cardinality: Cardinality,
}

impl QuerySpec {
    /// Create a query with no arguments.
    pub fn new(text: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            text: text.into(),
            arguments: Vec::new(),
            cardinality,
        }
    }

    /// Attach a named argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.push((name.into(), value.into()));
        self
    }

    /// Attach a set of named arguments.
    pub fn with_arguments(mut self, arguments: Vec<(String, Value)>) -> Self {
        self.arguments.extend(arguments);
        self
    }
}

/// Transaction isolation level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize,
    SerdeDeserialize,
)]
pub enum Isolation {
    /// Full serializable isolation.
    Serializable,
    /// Repeatable-read isolation.
    RepeatableRead,
}

/// Options for starting a transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize,
    SerdeDeserialize,
)]
pub struct TxOptions {
    /// Isolation level.
    pub isolation: Isolation,
    /// Reject write statements inside the transaction.
    pub read_only: bool,
    /// Defer constraint checks to commit.
    pub deferrable: bool,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            isolation: Isolation::Serializable,
            read_only: false,
            deferrable: false,
        }
    }
}

/// A request from client to server.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Request {
    /// Unique request identifier for correlation.
    pub id: u64,
    /// Session snapshot this request executes under.
    pub session: SessionState,
    /// The operation to perform.
    pub operation: Operation,
}

/// Operations that can be requested.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Operation {
    /// Execute a query and return its rows.
    Query(QuerySpec),
    /// Start a transaction on this connection.
    Begin(TxOptions),
    /// Commit the connection's active transaction.
    Commit,
    /// Roll back the connection's active transaction.
    Rollback,
    /// Ping the server (for health checks).
    Ping,
}

impl Request {
    /// Create a query request.
    pub fn query(id: u64, session: SessionState, spec: QuerySpec) -> Self {
        Self {
            id,
            session,
            operation: Operation::Query(spec),
        }
    }

    /// Create a begin-transaction request.
    pub fn begin(id: u64, session: SessionState, options: TxOptions) -> Self {
        Self {
            id,
            session,
            operation: Operation::Begin(options),
        }
    }

    /// Create a commit request.
    pub fn commit(id: u64, session: SessionState) -> Self {
        Self {
            id,
            session,
            operation: Operation::Commit,
        }
    }

    /// Create a rollback request.
    pub fn rollback(id: u64, session: SessionState) -> Self {
        Self {
            id,
            session,
            operation: Operation::Rollback,
        }
    }

    /// Create a ping request.
    pub fn ping(id: u64) -> Self {
        Self {
            id,
            session: SessionState::default(),
            operation: Operation::Ping,
        }
    }
}

/// A response from server to client.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Response {
    /// Request ID this response correlates to.
    pub id: u64,
    /// Response status.
    pub status: Status,
    /// Response payload.
    pub payload: ResponsePayload,
}

/// Response status.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Status {
    /// Request succeeded.
    Ok,
    /// Request failed with an error.
    Error {
        /// Error code for programmatic handling.
        code: u32,
        /// Human-readable error message.
        message: String,
    },
}

impl Status {
    /// Create an error status.
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Status::Error {
            code,
            message: message.into(),
        }
    }

    /// Check if this is a success status.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

/// Response payload variants.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum ResponsePayload {
    /// Query result rows.
    Rows(RowSet),
    /// Statement completed without returning rows.
    Complete {
        /// Rows affected, when the server can tell.
        affected: u64,
    },
    /// Transaction state change acknowledged (begin/commit/rollback).
    TxAck,
    /// Pong response to ping.
    Pong,
    /// Empty payload (for errors).
    Empty,
}

impl Response {
    /// Create a successful rows response.
    pub fn rows_ok(id: u64, rows: RowSet) -> Self {
        Self {
            id,
            status: Status::Ok,
            payload: ResponsePayload::Rows(rows),
        }
    }

    /// Create a successful no-rows completion response.
    pub fn complete_ok(id: u64, affected: u64) -> Self {
        Self {
            id,
            status: Status::Ok,
            payload: ResponsePayload::Complete { affected },
        }
    }

    /// Create a transaction acknowledgement response.
    pub fn tx_ack(id: u64) -> Self {
        Self {
            id,
            status: Status::Ok,
            payload: ResponsePayload::TxAck,
        }
    }

    /// Create a pong response.
    pub fn pong(id: u64) -> Self {
        Self {
            id,
            status: Status::Ok,
            payload: ResponsePayload::Pong,
        }
    }

    /// Create an error response.
    pub fn error(id: u64, code: u32, message: impl Into<String>) -> Self {
        Self {
            id,
            status: Status::error(code, message),
            payload: ResponsePayload::Empty,
        }
    }
}

/// Standard error codes.
pub mod error_codes {
    /// Unknown/internal error.
    pub const INTERNAL: u32 = 1;
    /// Query could not be parsed or planned.
    pub const INVALID_QUERY: u32 = 2;
    /// Authentication failed or session rejected.
    pub const ACCESS_DENIED: u32 = 3;
    /// Serialization conflict between concurrent transactions.
    pub const TRANSACTION_CONFLICT: u32 = 4;
    /// Commit/rollback without an active transaction, or begin inside one.
    pub const TRANSACTION_STATE: u32 = 5;
    /// Operation not supported by this server mode.
    pub const UNSUPPORTED: u32 = 6;
    /// Statement exceeded the server-side execution deadline.
    pub const DEADLINE_EXCEEDED: u32 = 7;

    /// Whether a failed request may succeed if the whole transaction is
    /// replayed.
    pub fn is_retryable(code: u32) -> bool {
        code == TRANSACTION_CONFLICT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_globals() {
        let mut session = SessionState::default();
        assert_eq!(session.module, "default");
        assert!(session.apply_access_policies);

        session.set_global("current_user_id", Value::Int64(7));
        session.set_global("current_user_id", Value::Int64(9));
        assert_eq!(session.global("current_user_id"), Some(&Value::Int64(9)));
        assert_eq!(session.globals.len(), 1);
        assert_eq!(session.global("missing"), None);
    }

    #[test]
    fn test_query_request() {
        let spec = QuerySpec::new("select User { name }", Cardinality::Many)
            .with_argument("min_age", 21i64);
        let request = Request::query(1, SessionState::default(), spec);

        assert_eq!(request.id, 1);
        if let Operation::Query(q) = &request.operation {
            assert_eq!(q.text, "select User { name }");
            assert_eq!(q.arguments, vec![("min_age".to_string(), Value::Int64(21))]);
            assert_eq!(q.cardinality, Cardinality::Many);
        } else {
            panic!("expected Query operation");
        }
    }

    #[test]
    fn test_tx_requests() {
        let begin = Request::begin(2, SessionState::default(), TxOptions::default());
        assert!(matches!(begin.operation, Operation::Begin(_)));
        assert!(matches!(
            Request::commit(3, SessionState::default()).operation,
            Operation::Commit
        ));
        assert!(matches!(
            Request::rollback(4, SessionState::default()).operation,
            Operation::Rollback
        ));
    }

    #[test]
    fn test_error_response() {
        let response = Response::error(42, error_codes::INVALID_QUERY, "syntax error");
        assert_eq!(response.id, 42);
        assert!(!response.status.is_ok());
        if let Status::Error { code, message } = &response.status {
            assert_eq!(*code, error_codes::INVALID_QUERY);
            assert_eq!(message, "syntax error");
        }
    }

    #[test]
    fn test_retryable_codes() {
        assert!(error_codes::is_retryable(error_codes::TRANSACTION_CONFLICT));
        assert!(!error_codes::is_retryable(error_codes::INTERNAL));
        assert!(!error_codes::is_retryable(error_codes::DEADLINE_EXCEEDED));
    }

    #[test]
    fn test_message_serialization_roundtrip() {
        let request = Request::query(
            100,
            SessionState::default(),
            QuerySpec::new("select 1", Cardinality::ExactlyOne),
        );

        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&request).unwrap();
        let archived = rkyv::access::<ArchivedRequest, rkyv::rancor::Error>(&bytes).unwrap();
        let back: Request = rkyv::deserialize::<Request, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(request, back);

        let response = Response::tx_ack(100);
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&response).unwrap();
        let archived = rkyv::access::<ArchivedResponse, rkyv::rancor::Error>(&bytes).unwrap();
        let back: Response =
            rkyv::deserialize::<Response, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(response, back);
    }
}
