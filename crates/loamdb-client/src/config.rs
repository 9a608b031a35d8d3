//! Client configuration.

use std::time::Duration;

use loamdb_proto::TxOptions;

use crate::naming::NamingStrategy;

/// Default TCP address for a LoamDB server.
pub const DEFAULT_ADDRESS: &str = "tcp://127.0.0.1:5656";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for acquiring a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default idle duration after which pooled connections are closed.
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(300);

/// Default maximum pool size.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Default transaction retry budget.
pub const DEFAULT_TRANSACTION_RETRIES: u32 = 3;

/// Default maximum message size (64 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Immutable client configuration snapshot.
///
/// Shared read-only by every component; reconfiguration produces a new
/// derived config rather than mutating an existing one.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address (e.g. "tcp://127.0.0.1:5656" or "ipc:///tmp/loamdb.sock").
    pub address: String,

    /// User name to authenticate as.
    pub username: String,

    /// Password, if the server requires one.
    pub password: Option<String>,

    /// Database branch to bind sessions to.
    pub branch: String,

    /// Per-request timeout; a request that exceeds it poisons its connection.
    pub request_timeout: Duration,

    /// Timeout for acquiring a pooled connection.
    pub acquire_timeout: Duration,

    /// Idle duration after which pooled connections are reaped.
    pub max_idle: Duration,

    /// Maximum number of live connections (checked out + idle).
    pub max_connections: usize,

    /// How many times a transaction body is replayed on serialization
    /// conflicts before giving up.
    pub transaction_retries: u32,

    /// Options for transactions started through this client.
    pub tx_options: TxOptions,

    /// Naming transform from caller-side field names to server attributes.
    pub naming: NamingStrategy,

    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl ClientConfig {
    /// Create a configuration for the given address with defaults.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: "admin".to_string(),
            password: None,
            branch: "main".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            max_idle: DEFAULT_MAX_IDLE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            transaction_retries: DEFAULT_TRANSACTION_RETRIES,
            tx_options: TxOptions::default(),
            naming: NamingStrategy::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Create a configuration for connecting to localhost on the default port.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }

    /// Set the credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = Some(password.into());
        self
    }

    /// Set the database branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pool acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the idle reap threshold.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Set the maximum pool size.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the transaction retry budget.
    pub fn with_transaction_retries(mut self, retries: u32) -> Self {
        self.transaction_retries = retries;
        self
    }

    /// Set the default transaction options.
    pub fn with_tx_options(mut self, options: TxOptions) -> Self {
        self.tx_options = options;
        self
    }

    /// Set the naming strategy.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Set the maximum message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.naming, NamingStrategy::Preserve);
        assert!(config.password.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("tcp://192.168.1.1:5656")
            .with_credentials("reader", "secret")
            .with_branch("analytics")
            .with_max_connections(4)
            .with_acquire_timeout(Duration::from_secs(5))
            .with_transaction_retries(7)
            .with_naming(NamingStrategy::SnakeCase);

        assert_eq!(config.address, "tcp://192.168.1.1:5656");
        assert_eq!(config.username, "reader");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.branch, "analytics");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.transaction_retries, 7);
        assert_eq!(config.naming, NamingStrategy::SnakeCase);
    }

    #[test]
    fn test_ipc_address() {
        let config = ClientConfig::new("ipc:///tmp/loamdb.sock");
        assert_eq!(config.address, "ipc:///tmp/loamdb.sock");
    }
}
