//! LoamDB client API.
//!
//! [`Client`] is the entry point callers hold: a handle over a shared
//! connection pool plus an immutable session snapshot. Deriving a client
//! (`with_globals`, `with_module`, ...) changes only the snapshot; the
//! derived client shares the same pool.

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use loamdb_proto::handshake::capabilities;
use loamdb_proto::{Cardinality, QuerySpec, SessionState, Value};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::executor;
use crate::mapping::{map_rows, FromRow};
use crate::pool::Pool;
use crate::transaction::Transaction;

/// A pooled client for a LoamDB server.
///
/// # Example
///
/// ```ignore
/// use loamdb_client::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new(ClientConfig::localhost());
///
///     let names: Vec<String> = client
///         .query("select User { name }", &[])
///         .await?;
///
///     client.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    pool: Pool,
    config: Arc<ClientConfig>,
    session: SessionState,
}

impl Client {
    /// Create a client. Connections are established lazily on first use.
    pub fn new(config: ClientConfig) -> Self {
        let pool = Pool::new(config.clone());
        Self {
            pool,
            config: Arc::new(config),
            session: SessionState::default(),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session snapshot sent with every request.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The underlying pool, shared with derived clients.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Derive a client with the given global variable bindings added.
    ///
    /// The derived client shares this client's pool.
    pub fn with_globals(&self, globals: &[(&str, Value)]) -> Self {
        let mut session = self.session.clone();
        for (name, value) in globals {
            session.set_global(*name, value.clone());
        }
        self.with_session(session)
    }

    /// Derive a client bound to a different default module.
    pub fn with_module(&self, module: impl Into<String>) -> Self {
        let mut session = self.session.clone();
        session.module = module.into();
        self.with_session(session)
    }

    /// Derive a client with access policies switched on or off.
    pub fn with_access_policies(&self, apply: bool) -> Self {
        let mut session = self.session.clone();
        session.apply_access_policies = apply;
        self.with_session(session)
    }

    /// Derive a client with a fully custom session snapshot.
    pub fn with_session(&self, session: SessionState) -> Self {
        Self {
            pool: self.pool.clone(),
            config: self.config.clone(),
            session,
        }
    }

    fn spec(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
        cardinality: Cardinality,
    ) -> QuerySpec {
        QuerySpec::new(query, cardinality).with_arguments(
            arguments
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        )
    }

    async fn run(&self, spec: QuerySpec) -> Result<loamdb_proto::RowSet, Error> {
        let mut conn = self.pool.acquire().await?;
        executor::run_query(&mut conn, self.session.clone(), spec).await
    }

    /// Execute a statement, discarding any rows.
    ///
    /// Protocol and cardinality failures still surface.
    pub async fn execute(&self, query: &str, arguments: &[(&str, Value)]) -> Result<(), Error> {
        self.run(self.spec(query, arguments, Cardinality::NoResult))
            .await
            .map(|_| ())
    }

    /// Run a query expecting zero or more rows.
    pub async fn query<T: FromRow>(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
    ) -> Result<Vec<T>, Error> {
        let rows = self.run(self.spec(query, arguments, Cardinality::Many)).await?;
        map_rows(&rows, self.config.naming)
    }

    /// Run a query expecting zero or one row.
    ///
    /// More than one row is a [`Error::CardinalityViolation`].
    pub async fn query_single<T: FromRow>(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
    ) -> Result<Option<T>, Error> {
        let rows = self
            .run(self.spec(query, arguments, Cardinality::AtMostOne))
            .await?;
        Ok(map_rows(&rows, self.config.naming)?.pop())
    }

    /// Run a query expecting exactly one row.
    ///
    /// Zero rows or more than one row is a [`Error::CardinalityViolation`].
    pub async fn query_required_single<T: FromRow>(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
    ) -> Result<T, Error> {
        let rows = self
            .run(self.spec(query, arguments, Cardinality::ExactlyOne))
            .await?;
        map_rows(&rows, self.config.naming)?
            .pop()
            .ok_or_else(|| Error::Mapping("cardinality-checked row missing".into()))
    }

    /// Ping the server to check connectivity.
    pub async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        executor::run_ping(&mut conn).await
    }

    /// Run `body` inside a transaction, retrying the whole body on
    /// serialization conflicts.
    ///
    /// The body receives a [`Transaction`] handle bound to one exclusively
    /// reserved connection. When the body returns `Ok` the transaction
    /// commits; when it returns `Err` it rolls back. A retryable conflict
    /// (during the body or the commit) replays the body on a fresh
    /// transaction, up to the configured retry budget, after which
    /// [`Error::Transaction`] is surfaced. The reserved connection is
    /// released on every exit path.
    ///
    /// Fails fast with [`Error::Capability`] when the server does not
    /// support transactions.
    pub async fn transaction<T, B, F>(&self, body: B) -> Result<T, Error>
    where
        B: Fn(Transaction) -> F,
        F: Future<Output = Result<T, Error>>,
    {
        let retries = self.config.transaction_retries;
        let mut attempt: u32 = 0;

        loop {
            let conn = self.pool.acquire().await?;
            if !conn.has_capability(capabilities::TRANSACTIONS) {
                return Err(Error::Capability(
                    "server does not support transactions".to_string(),
                ));
            }

            let tx = Transaction::begin(
                conn,
                self.session.clone(),
                self.config.naming,
                self.config.tx_options,
            )
            .await?;

            let outcome = body(tx.clone()).await;

            let failure = match outcome {
                Ok(value) => match tx.commit().await {
                    Ok(()) => return Ok(value),
                    Err(err) => err,
                },
                Err(err) => {
                    if let Err(rb) = tx.rollback().await {
                        warn!(error = %rb, "rollback failed");
                    }
                    err
                }
            };

            if !failure.is_retryable() {
                return Err(failure);
            }
            if attempt >= retries {
                return Err(Error::Transaction(format!(
                    "failed after {} attempt(s): {}",
                    attempt + 1,
                    failure
                )));
            }
            attempt += 1;
            warn!(attempt, error = %failure, "retrying transaction");
        }
    }

    /// Close the underlying pool.
    ///
    /// Derived clients sharing the pool are closed too.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.config.address)
            .field("module", &self.session.module)
            .field("globals", &self.session.globals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_clients_share_pool() {
        let client = Client::new(ClientConfig::localhost().with_max_connections(3));
        let derived = client
            .with_globals(&[("current_user_id", Value::Int64(7))])
            .with_module("audit");

        assert_eq!(derived.session().module, "audit");
        assert_eq!(
            derived.session().global("current_user_id"),
            Some(&Value::Int64(7))
        );
        // The base session is untouched.
        assert_eq!(client.session().module, "default");
        assert_eq!(client.session().global("current_user_id"), None);
        // Both handles point at one pool.
        assert_eq!(client.pool().capacity(), derived.pool().capacity());
    }

    #[test]
    fn test_with_access_policies() {
        let client = Client::new(ClientConfig::localhost());
        assert!(client.session().apply_access_policies);
        let relaxed = client.with_access_policies(false);
        assert!(!relaxed.session().apply_access_policies);
    }
}
