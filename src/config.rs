//! Configuration for craqkv
//!
//! Centralized node configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a chain node
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Chain Configuration
    // -------------------------------------------------------------------------
    /// Position of this node in the chain table (0 = head)
    pub node_index: usize,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for this node's files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── wal.log          (write-ahead log, JSON lines)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: whether each append is fsynced
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Worker threads serving connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// Timeout for calls to other chain nodes (milliseconds).
    /// Expiry is reported as a propagation failure.
    pub peer_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// Flush to the OS page cache only; survives process crashes but not power loss
    FlushOnly,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_index: 0,
            data_dir: PathBuf::from("./states/0"),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            listen_addr: "127.0.0.1:8080".to_string(),
            worker_threads: 64,
            read_timeout_ms: 30_000,
            write_timeout_ms: 5000,
            peer_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Timeout applied to node-to-node calls
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the node's position in the chain
    pub fn node_index(mut self, index: usize) -> Self {
        self.config.node_index = index;
        self
    }

    /// Set the data directory (root for this node's storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the node-to-node call timeout (in milliseconds)
    pub fn peer_timeout_ms(mut self, ms: u64) -> Self {
        self.config.peer_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
