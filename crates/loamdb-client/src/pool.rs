//! Connection pooling.
//!
//! The pool owns every [`Connection`] that is not currently checked out.
//! Admission is bounded by a fair semaphore, so waiters are served in
//! arrival order; the number of live connections (checked out + idle) never
//! exceeds `max_connections`. Connections are created lazily, reaped after
//! `max_idle` of inactivity, and destroyed when broken — capacity is
//! replenished lazily by the next acquire.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Error;

/// Internal pool state.
///
/// The mutex guards bookkeeping only; it is never held across network I/O.
struct PoolInner {
    config: ClientConfig,
    idle: Mutex<VecDeque<Connection>>,
    semaphore: Semaphore,
}

impl PoolInner {
    /// Drop idle connections that have aged out or gone unhealthy.
    async fn reap_idle(&self) {
        let mut idle = self.idle.lock().await;
        let before = idle.len();
        idle.retain(|conn| conn.is_ready() && conn.idle_for() < self.config.max_idle);
        let reaped = before - idle.len();
        if reaped > 0 {
            debug!(reaped, "closed idle connections");
        }
    }

    /// Take an idle connection or establish a new one.
    ///
    /// Must only be called while holding an admission permit.
    async fn checkout(&self) -> Result<Connection, Error> {
        {
            let mut idle = self.idle.lock().await;
            while let Some(conn) = idle.pop_front() {
                if conn.is_ready() {
                    return Ok(conn);
                }
                // Dead connection slipped in; discard it.
            }
        }

        Connection::establish(self.config.clone()).await
    }

    /// Return a checked-out connection and release its admission permit.
    async fn give_back(&self, mut conn: Connection) {
        if conn.is_ready() && conn.idle_for() < self.config.max_idle {
            let mut idle = self.idle.lock().await;
            idle.push_back(conn);
        } else {
            debug!(state = ?conn.state(), "destroying returned connection");
            conn.close();
        }

        self.reap_idle().await;
        self.semaphore.add_permits(1);
    }
}

/// A bounded pool of connections to one server.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Create a pool. No connections are established until first use.
    pub fn new(config: ClientConfig) -> Self {
        let semaphore = Semaphore::new(config.max_connections);
        Self {
            inner: Arc::new(PoolInner {
                config,
                idle: Mutex::new(VecDeque::new()),
                semaphore,
            }),
        }
    }

    /// Acquire a connection, waiting up to the configured acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConnection, Error> {
        self.acquire_timeout(self.inner.config.acquire_timeout).await
    }

    /// Acquire a connection, waiting up to a caller-supplied timeout.
    ///
    /// Waiters are admitted in FIFO order. A timed-out or cancelled waiter
    /// leaves the queue with no side effects. A zero timeout fails
    /// immediately when the pool is at capacity.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<PooledConnection, Error> {
        let permit = tokio::time::timeout(timeout, self.inner.semaphore.acquire())
            .await
            .map_err(|_| Error::PoolExhausted)?
            .map_err(|_| Error::Connection("pool is closed".to_string()))?;

        self.inner.reap_idle().await;

        let conn = self.inner.checkout().await?;

        // The permit travels with the connection; give_back restores it.
        permit.forget();

        Ok(PooledConnection {
            connection: Some(conn),
            pool: self.inner.clone(),
            checked_out_at: Instant::now(),
        })
    }

    /// Close the pool: reject new acquires and drop all idle connections.
    pub async fn close(&self) {
        self.inner.semaphore.close();
        let mut idle = self.inner.idle.lock().await;
        for mut conn in idle.drain(..) {
            conn.close();
        }
    }

    /// Number of idle connections currently held by the pool.
    pub async fn idle_count(&self) -> usize {
        self.inner.idle.lock().await.len()
    }

    /// Maximum number of live connections.
    pub fn capacity(&self) -> usize {
        self.inner.config.max_connections
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("max_connections", &self.inner.config.max_connections)
            .field("address", &self.inner.config.address)
            .finish()
    }
}

/// A connection checked out of the pool.
///
/// Returns itself to the pool when dropped: healthy connections rejoin the
/// idle set, broken ones are destroyed and their capacity is replenished
/// lazily. Either way the admission permit is released exactly once.
pub struct PooledConnection {
    connection: Option<Connection>,
    pool: Arc<PoolInner>,
    checked_out_at: Instant,
}

impl PooledConnection {
    /// How long this connection has been checked out.
    pub fn held_for(&self) -> Duration {
        self.checked_out_at.elapsed()
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.connection
            .as_ref()
            .expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.connection
            .as_mut()
            .expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.take() {
            let pool = self.pool.clone();
            tokio::spawn(async move {
                pool.give_back(conn).await;
            });
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection", &self.connection)
            .field("held_for", &self.held_for())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_capacity_from_config() {
        let pool = Pool::new(ClientConfig::localhost().with_max_connections(4));
        assert_eq!(pool.capacity(), 4);
    }

    #[tokio::test]
    async fn test_acquire_times_out_against_dead_endpoint() {
        // No server is listening; establishing repeatedly fails, and a
        // zero acquire timeout must not wait for the semaphore.
        let pool = Pool::new(
            ClientConfig::new("inproc://pool-unit-nobody-home")
                .with_max_connections(1)
                .with_request_timeout(Duration::from_millis(50))
                .with_acquire_timeout(Duration::from_millis(50)),
        );

        let result = pool.acquire().await;
        assert!(result.is_err());
        assert_eq!(pool.idle_count().await, 0);
    }
}
