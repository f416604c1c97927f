//! Node-to-node transports
//!
//! `ChainNode` reaches its successor and the tail only through the
//! [`ChainTransport`] trait, so the replication protocol can run over TCP or
//! inside a single process.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;

use crate::chain::NodeInfo;
use crate::error::{CraqError, Result};
use crate::node::ChainNode;
use crate::protocol::PropagateWrite;
use crate::store::Value;

/// Calls a chain node makes on other chain nodes
///
/// `KeyNotFound` must be passed through unchanged; every other error is
/// treated by the caller as a failed downstream call.
pub trait ChainTransport: Send + Sync {
    /// Deliver a write to `target` and wait until it has committed
    fn propagate(&self, target: &NodeInfo, write: &PropagateWrite) -> Result<()>;

    /// Committed version of `key` at `target` (the tail)
    fn query_version(&self, target: &NodeInfo, key: &str) -> Result<u64>;

    /// Committed value of `key` at `target` (the tail)
    fn fetch_committed(&self, target: &NodeInfo, key: &str) -> Result<Value>;
}

// =============================================================================
// TCP
// =============================================================================

/// Opens one short-lived TCP connection per call
#[derive(Debug, Clone)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    /// `timeout` bounds connect, send and receive for each call
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ChainTransport for TcpTransport {
    fn propagate(&self, target: &NodeInfo, write: &PropagateWrite) -> Result<()> {
        tracing::debug!(
            "propagate write to {} ({}) for {} (v={})",
            target.id,
            target.addr,
            write.key,
            write.version
        );
        super::Client::connect(&target.addr, self.timeout)?.propagate(write)
    }

    fn query_version(&self, target: &NodeInfo, key: &str) -> Result<u64> {
        super::Client::connect(&target.addr, self.timeout)?.query_version(key)
    }

    fn fetch_committed(&self, target: &NodeInfo, key: &str) -> Result<Value> {
        super::Client::connect(&target.addr, self.timeout)?.fetch_committed(key)
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Routes calls directly to `ChainNode`s living in the same process
///
/// Nodes are held weakly so the transport and the nodes that own it do not
/// keep each other alive. An address with no registered node behaves like an
/// unreachable peer.
#[derive(Default)]
pub struct LocalTransport {
    nodes: RwLock<HashMap<String, Weak<ChainNode>>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `node` reachable at `addr`
    pub fn register(&self, addr: impl Into<String>, node: &Arc<ChainNode>) {
        self.nodes.write().insert(addr.into(), Arc::downgrade(node));
    }

    /// Make `addr` unreachable; returns whether it was registered
    pub fn disconnect(&self, addr: &str) -> bool {
        self.nodes.write().remove(addr).is_some()
    }

    fn route(&self, target: &NodeInfo) -> Result<Arc<ChainNode>> {
        self.nodes
            .read()
            .get(&target.addr)
            .and_then(Weak::upgrade)
            .ok_or_else(|| CraqError::Network(format!("no route to {} ({})", target.id, target.addr)))
    }
}

impl ChainTransport for LocalTransport {
    fn propagate(&self, target: &NodeInfo, write: &PropagateWrite) -> Result<()> {
        self.route(target)?.handle_propagated_write(write.clone())
    }

    fn query_version(&self, target: &NodeInfo, key: &str) -> Result<u64> {
        self.route(target)?.handle_version_query(key)
    }

    fn fetch_committed(&self, target: &NodeInfo, key: &str) -> Result<Value> {
        self.route(target)?.handle_fetch_committed(key)
    }
}
