//! Client error types.

use thiserror::Error;

use loamdb_proto::{error_codes, CardinalityError};

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or authentication failure; the connection is discarded.
    #[error("connection error: {0}")]
    Connection(String),

    /// Malformed wire data; fatal to the connection it arrived on.
    #[error("protocol error: {0}")]
    Protocol(#[from] loamdb_proto::Error),

    /// No pooled connection became available within the acquire timeout.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Result shape does not satisfy the query's declared cardinality.
    #[error(transparent)]
    CardinalityViolation(#[from] CardinalityError),

    /// A decoded value could not be converted into the requested type.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// Transaction retry budget exhausted, or the transaction was used
    /// outside its lifecycle.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Operation unsupported by the current server or connection mode.
    #[error("capability error: {0}")]
    Capability(String),

    /// Error reported by the server.
    #[error("server error {code}: {message}")]
    Server {
        /// Server error code (see [`loamdb_proto::error_codes`]).
        code: u32,
        /// Human-readable message.
        message: String,
    },

    /// Request timed out; the connection is considered poisoned.
    #[error("request timed out")]
    Timeout,
}

impl Error {
    /// Whether replaying the enclosing transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Server { code, .. } if error_codes::is_retryable(*code))
    }
}
