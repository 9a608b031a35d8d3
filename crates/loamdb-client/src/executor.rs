//! Query execution over a single connection.
//!
//! Shared by the client (pooled connections) and transactions (the bound
//! connection): builds the request, round-trips it, converts server errors
//! into typed client errors, and enforces the declared cardinality.

use loamdb_proto::{
    Operation, QuerySpec, Request, Response, ResponsePayload, RowSet, SessionState, Status,
};

use crate::connection::Connection;
use crate::error::Error;

/// Unwrap a response, mapping a server-reported failure to [`Error::Server`].
fn check_status(response: Response) -> Result<ResponsePayload, Error> {
    match response.status {
        Status::Ok => Ok(response.payload),
        Status::Error { code, message } => Err(Error::Server { code, message }),
    }
}

/// Execute a query and return its rows, cardinality-checked.
pub async fn run_query(
    conn: &mut Connection,
    session: SessionState,
    spec: QuerySpec,
) -> Result<RowSet, Error> {
    let cardinality = spec.cardinality;
    let id = conn.next_request_id();
    let request = Request::query(id, session, spec);
    let response = conn.round_trip(&request).await?;

    let rows = match check_status(response)? {
        ResponsePayload::Rows(rows) => rows,
        ResponsePayload::Complete { .. } => RowSet::new(vec![]),
        other => {
            return Err(Error::Protocol(loamdb_proto::Error::InvalidMessage(
                format!("expected rows payload, got {:?}", other),
            )))
        }
    };

    rows.expect(cardinality)?;
    Ok(rows)
}

/// Execute a control operation (begin/commit/rollback), expecting a
/// transaction acknowledgement.
pub async fn run_control(
    conn: &mut Connection,
    session: SessionState,
    operation: Operation,
) -> Result<(), Error> {
    let id = conn.next_request_id();
    let request = Request {
        id,
        session,
        operation,
    };
    let response = conn.round_trip(&request).await?;

    match check_status(response)? {
        ResponsePayload::TxAck => Ok(()),
        other => Err(Error::Protocol(loamdb_proto::Error::InvalidMessage(
            format!("expected transaction acknowledgement, got {:?}", other),
        ))),
    }
}

/// Ping the server through a connection.
pub async fn run_ping(conn: &mut Connection) -> Result<(), Error> {
    let id = conn.next_request_id();
    let request = Request::ping(id);
    let response = conn.round_trip(&request).await?;

    match check_status(response)? {
        ResponsePayload::Pong => Ok(()),
        other => Err(Error::Protocol(loamdb_proto::Error::InvalidMessage(
            format!("expected pong, got {:?}", other),
        ))),
    }
}
