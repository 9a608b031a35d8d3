//! LoamDB client driver.
//!
//! Async, pool-backed client for LoamDB servers: bounded FIFO connection
//! pooling, cardinality-checked query execution, typed row mapping, and
//! retrying transactions over an exclusively reserved connection.
//!
//! # Quick Start
//!
//! ```ignore
//! use loamdb_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::localhost());
//!
//!     // Cardinality is part of the call: query / query_single /
//!     // query_required_single.
//!     let title: String = client
//!         .query_required_single("select Post { title } limit 1", &[])
//!         .await?;
//!
//!     // Transactions replay the body on serialization conflicts.
//!     client
//!         .transaction(|tx| async move {
//!             tx.execute("update Counter set { value := .value + 1 }", &[])
//!                 .await
//!         })
//!         .await?;
//!
//!     println!("{title}");
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod naming;
pub mod pool;
pub mod transaction;

pub use client::Client;
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionState};
pub use error::Error;
pub use mapping::{FromRow, FromValue, Row};
pub use naming::NamingStrategy;
pub use pool::{Pool, PooledConnection};
pub use transaction::{Transaction, TransactionState};

/// Re-export protocol types.
pub use loamdb_proto as proto;
