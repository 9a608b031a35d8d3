//! Connection management.
//!
//! A [`Connection`] is one authenticated session to a server: a REQ socket,
//! the negotiated capabilities, and the connection's health state. Any I/O
//! or decode failure marks the connection [`Broken`](ConnectionState::Broken);
//! a broken connection is never returned to service.

use std::time::{Duration, Instant};

use async_nng::AsyncContext;
use nng::options::Options;
use nng::{Message, Protocol, Socket};
use tracing::debug;

use loamdb_proto::codec;
use loamdb_proto::handshake::Hello;
use loamdb_proto::{Request, Response};

use crate::config::ClientConfig;
use crate::error::Error;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket dialed, hello not yet exchanged.
    Connected,
    /// Hello accepted; ready for requests.
    Ready,
    /// A request failed mid-flight; the connection must be discarded.
    Broken,
    /// Connection closed.
    Closed,
}

/// A single authenticated connection to a LoamDB server.
pub struct Connection {
    socket: Socket,
    state: ConnectionState,
    config: ClientConfig,
    server_id: String,
    server_capabilities: Vec<String>,
    last_used: Instant,
    next_request_id: u64,
}

impl Connection {
    /// Dial the server and perform the hello exchange.
    pub async fn establish(config: ClientConfig) -> Result<Self, Error> {
        let socket = Socket::new(Protocol::Req0)
            .map_err(|e| Error::Connection(format!("failed to create socket: {}", e)))?;

        socket
            .set_opt::<nng::options::RecvMaxSize>(config.max_message_size)
            .map_err(|e| Error::Connection(format!("failed to set max message size: {}", e)))?;
        socket
            .set_opt::<nng::options::SendTimeout>(Some(config.request_timeout))
            .map_err(|e| Error::Connection(format!("failed to set send timeout: {}", e)))?;
        socket
            .set_opt::<nng::options::RecvTimeout>(Some(config.request_timeout))
            .map_err(|e| Error::Connection(format!("failed to set recv timeout: {}", e)))?;

        socket.dial(&config.address).map_err(|e| {
            Error::Connection(format!("failed to connect to {}: {}", config.address, e))
        })?;

        let mut conn = Self {
            socket,
            state: ConnectionState::Connected,
            config,
            server_id: String::new(),
            server_capabilities: Vec::new(),
            last_used: Instant::now(),
            next_request_id: 1,
        };
        conn.hello().await?;
        Ok(conn)
    }

    /// Exchange hello frames, authenticating and capturing server
    /// capabilities.
    async fn hello(&mut self) -> Result<(), Error> {
        let mut hello = Hello::new(&self.config.username, &self.config.branch);
        if let Some(password) = &self.config.password {
            hello = hello.with_password(password);
        }

        let frame = codec::encode_hello(&hello)?;
        let reply = self.exchange(frame).await?;
        let response = codec::decode_hello_response(&reply).map_err(|e| {
            self.state = ConnectionState::Broken;
            Error::Protocol(e)
        })?;

        if !response.accepted {
            self.state = ConnectionState::Closed;
            return Err(Error::Connection(format!(
                "server rejected connection: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown reason".to_string())
            )));
        }

        if response.protocol_version != loamdb_proto::PROTOCOL_VERSION {
            self.state = ConnectionState::Closed;
            return Err(Error::Protocol(loamdb_proto::Error::VersionMismatch {
                expected: loamdb_proto::PROTOCOL_VERSION,
                actual: response.protocol_version,
            }));
        }

        self.server_id = response.server_id;
        self.server_capabilities = response.capabilities;
        self.state = ConnectionState::Ready;
        self.last_used = Instant::now();

        debug!(
            server_id = %self.server_id,
            address = %self.config.address,
            "connection established"
        );
        Ok(())
    }

    /// Send a framed buffer and await the reply frame.
    ///
    /// Any send, receive, or timeout failure marks the connection broken.
    async fn exchange(&mut self, frame: Vec<u8>) -> Result<Vec<u8>, Error> {
        let timeout = self.config.request_timeout;
        let socket = &self.socket;

        let result = async move {
            let mut ctx = AsyncContext::try_from(socket).map_err(|e| {
                Error::Connection(format!("failed to create async context: {}", e))
            })?;

            let msg = Message::from(frame.as_slice());
            ctx.send(msg, Some(timeout)).await.map_err(|(_, e)| match e {
                nng::Error::TimedOut => Error::Timeout,
                _ => Error::Connection(format!("failed to send request: {}", e)),
            })?;

            let reply = ctx.receive(Some(timeout)).await.map_err(|e| match e {
                nng::Error::TimedOut => Error::Timeout,
                _ => Error::Connection(format!("failed to receive response: {}", e)),
            })?;

            Ok::<_, Error>(reply.as_slice().to_vec())
        }
        .await;

        if result.is_err() {
            self.state = ConnectionState::Broken;
        }
        result
    }

    /// Send a request and receive its response.
    pub async fn round_trip(&mut self, request: &Request) -> Result<Response, Error> {
        if self.state != ConnectionState::Ready {
            return Err(Error::Connection(format!(
                "cannot send request in state {:?}",
                self.state
            )));
        }

        let frame = codec::encode_request(request)?;
        if frame.len() > self.config.max_message_size {
            return Err(Error::Protocol(loamdb_proto::Error::InvalidMessage(
                format!(
                    "request too large: {} bytes (max: {})",
                    frame.len(),
                    self.config.max_message_size
                ),
            )));
        }

        let reply = self.exchange(frame).await?;
        let response = codec::decode_response(&reply).map_err(|e| {
            self.state = ConnectionState::Broken;
            Error::Protocol(e)
        })?;

        if response.id != request.id {
            self.state = ConnectionState::Broken;
            return Err(Error::Protocol(loamdb_proto::Error::InvalidMessage(
                format!(
                    "response ID mismatch: expected {}, got {}",
                    request.id, response.id
                ),
            )));
        }

        self.last_used = Instant::now();
        Ok(response)
    }

    /// Allocate the next request ID on this connection.
    pub fn next_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Closed;
        }
        // Socket is dropped with the connection.
    }

    /// Check if the connection can serve requests.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// How long since the last successful round trip.
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// Get the server identifier reported in the hello exchange.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Get the server capabilities.
    pub fn server_capabilities(&self) -> &[String] {
        &self.server_capabilities
    }

    /// Check if the server advertised a capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.server_capabilities.iter().any(|c| c == capability)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.config.address)
            .field("state", &self.state)
            .field("server_id", &self.server_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state() {
        assert_eq!(ConnectionState::Connected, ConnectionState::Connected);
        assert_ne!(ConnectionState::Connected, ConnectionState::Ready);
        assert_ne!(ConnectionState::Broken, ConnectionState::Closed);
    }

    #[test]
    fn test_establish_rejects_bad_address() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let config = ClientConfig::new("tcp://256.0.0.1:1").with_request_timeout(
            std::time::Duration::from_millis(50),
        );
        let result = rt.block_on(Connection::establish(config));
        assert!(matches!(result, Err(Error::Connection(_)) | Err(Error::Timeout)));
    }
}
