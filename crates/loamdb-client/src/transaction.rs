//! Transaction coordination.
//!
//! A [`Transaction`] exclusively reserves one pooled connection from begin
//! until a terminal state, then releases it back to the pool exactly once.
//! Concurrent operations on one transaction are serialized by an internal
//! lock; two bodies can never interleave on the same connection.
//!
//! Retry handling lives in [`Client::transaction`](crate::Client::transaction):
//! a serialization conflict rolls the attempt back and replays the whole
//! body on a fresh transaction, up to the configured budget.

use std::sync::Arc;

use tokio::sync::Mutex;

use loamdb_proto::{Operation, QuerySpec, SessionState, TxOptions, Value};

use crate::error::Error;
use crate::executor;
use crate::mapping::{map_rows, FromRow};
use crate::naming::NamingStrategy;
use crate::pool::PooledConnection;

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Begin has not been sent.
    NotStarted,
    /// Begin acknowledged; statements may execute.
    Active,
    /// Commit is in flight.
    Committing,
    /// Commit acknowledged.
    Committed,
    /// Rollback acknowledged (or the attempt was abandoned cleanly).
    RolledBack,
    /// A connection-level failure ended the transaction; the connection
    /// was destroyed.
    Failed,
}

impl TransactionState {
    /// Whether the transaction can accept further statements.
    pub fn is_active(self) -> bool {
        self == TransactionState::Active
    }

    /// Whether the state machine has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::RolledBack | TransactionState::Failed
        )
    }
}

struct TxSlot {
    conn: Option<PooledConnection>,
    state: TransactionState,
}

impl TxSlot {
    /// Borrow the bound connection, or fail if the transaction already
    /// released it.
    fn conn(&mut self) -> Result<&mut PooledConnection, Error> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::Transaction("transaction connection already released".into()))
    }

    /// Drop the bound connection, returning it to the pool. The pool
    /// destroys it if it is broken. Safe to call more than once.
    fn release(&mut self) {
        self.conn.take();
    }
}

struct TxInner {
    session: SessionState,
    naming: NamingStrategy,
    slot: Mutex<TxSlot>,
}

/// A handle to an in-progress transaction.
///
/// Handles are cheap to clone; all clones drive the same state machine and
/// the same bound connection.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TxInner>,
}

impl Transaction {
    /// Reserve `conn` and send Begin. On any failure the connection goes
    /// straight back to the pool.
    pub(crate) async fn begin(
        mut conn: PooledConnection,
        session: SessionState,
        naming: NamingStrategy,
        options: TxOptions,
    ) -> Result<Self, Error> {
        // An error drops `conn` here, which releases it to the pool.
        executor::run_control(&mut conn, session.clone(), Operation::Begin(options)).await?;

        Ok(Self {
            inner: Arc::new(TxInner {
                session,
                naming,
                slot: Mutex::new(TxSlot {
                    conn: Some(conn),
                    state: TransactionState::Active,
                }),
            }),
        })
    }

    /// Current state of the transaction.
    pub async fn state(&self) -> TransactionState {
        self.inner.slot.lock().await.state
    }

    fn spec(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
        cardinality: loamdb_proto::Cardinality,
    ) -> QuerySpec {
        QuerySpec::new(query, cardinality).with_arguments(
            arguments
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        )
    }

    /// Run one statement inside the transaction.
    ///
    /// Connection-level failures (I/O, timeout, malformed frames) move the
    /// transaction to `Failed` and destroy the connection. Server-reported
    /// errors leave the state machine alone so the caller can roll back.
    async fn run(&self, spec: QuerySpec) -> Result<loamdb_proto::RowSet, Error> {
        let mut slot = self.inner.slot.lock().await;
        if !slot.state.is_active() {
            return Err(Error::Transaction(format!(
                "transaction is {:?}, not active",
                slot.state
            )));
        }

        let conn = slot.conn()?;
        let result = executor::run_query(conn, self.inner.session.clone(), spec).await;

        if let Err(err) = &result {
            if connection_fatal(err) {
                slot.state = TransactionState::Failed;
                slot.release();
            }
        }
        result
    }

    /// Execute a statement, discarding any rows.
    pub async fn execute(&self, query: &str, arguments: &[(&str, Value)]) -> Result<(), Error> {
        self.run(self.spec(query, arguments, loamdb_proto::Cardinality::NoResult))
            .await
            .map(|_| ())
    }

    /// Run a query expecting zero or more rows.
    pub async fn query<T: FromRow>(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
    ) -> Result<Vec<T>, Error> {
        let rows = self
            .run(self.spec(query, arguments, loamdb_proto::Cardinality::Many))
            .await?;
        map_rows(&rows, self.inner.naming)
    }

    /// Run a query expecting zero or one row.
    pub async fn query_single<T: FromRow>(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
    ) -> Result<Option<T>, Error> {
        let rows = self
            .run(self.spec(query, arguments, loamdb_proto::Cardinality::AtMostOne))
            .await?;
        Ok(map_rows(&rows, self.inner.naming)?.pop())
    }

    /// Run a query expecting exactly one row.
    pub async fn query_required_single<T: FromRow>(
        &self,
        query: &str,
        arguments: &[(&str, Value)],
    ) -> Result<T, Error> {
        let rows = self
            .run(self.spec(query, arguments, loamdb_proto::Cardinality::ExactlyOne))
            .await?;
        map_rows(&rows, self.inner.naming)?
            .pop()
            .ok_or_else(|| Error::Mapping("cardinality-checked row missing".into()))
    }

    /// Commit the transaction and release the connection.
    pub(crate) async fn commit(&self) -> Result<(), Error> {
        let mut slot = self.inner.slot.lock().await;
        if !slot.state.is_active() {
            return Err(Error::Transaction(format!(
                "cannot commit a transaction in state {:?}",
                slot.state
            )));
        }

        slot.state = TransactionState::Committing;
        let conn = slot.conn()?;
        let result =
            executor::run_control(conn, self.inner.session.clone(), Operation::Commit).await;

        match result {
            Ok(()) => {
                slot.state = TransactionState::Committed;
                slot.release();
                Ok(())
            }
            Err(err) => {
                // Conflict or failure during commit: terminal for this
                // attempt either way; the driver loop may retry with a
                // fresh transaction.
                slot.state = TransactionState::Failed;
                slot.release();
                Err(err)
            }
        }
    }

    /// Roll the transaction back and release the connection.
    ///
    /// A transaction that already failed (connection destroyed) is left in
    /// `Failed`; rollback then only guarantees the connection is released.
    pub(crate) async fn rollback(&self) -> Result<(), Error> {
        let mut slot = self.inner.slot.lock().await;
        match slot.state {
            TransactionState::Active => {
                let conn = slot.conn()?;
                let result =
                    executor::run_control(conn, self.inner.session.clone(), Operation::Rollback)
                        .await;
                slot.state = match result {
                    Ok(()) => TransactionState::RolledBack,
                    Err(_) => TransactionState::Failed,
                };
                slot.release();
                result
            }
            _ => {
                // Terminal or never-started: nothing to undo, but never
                // leak the connection.
                slot.release();
                Ok(())
            }
        }
    }
}

/// Whether an error means the connection itself is unusable.
fn connection_fatal(err: &Error) -> bool {
    matches!(
        err,
        Error::Connection(_) | Error::Protocol(_) | Error::Timeout
    )
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").finish_non_exhaustive()
    }
}
