//! Chain Node Module
//!
//! The CRAQ replication protocol for one member of the chain.
//!
//! ## Responsibilities
//! - Head: assign versions, store, propagate, commit after the chain acks
//! - Middle: store, forward, commit after the tail side acks
//! - Tail: store and commit immediately; answer version queries
//! - Every role: serve reads, resolving dirty objects against the tail
//!
//! ## Write Path
//! ```text
//!  client ─SET─► head ─PROPAGATE─► middle ─PROPAGATE─► tail
//!                 │                  │                  │ set + commit
//!                 │                  │ ◄──────ok────────┘
//!                 │ ◄──────ok────────┘ commit
//!  client ◄─ack── commit
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::chain::{ChainTopology, NodeInfo, Role};
use crate::config::Config;
use crate::error::{CraqError, Result};
use crate::network::ChainTransport;
use crate::protocol::{encode_value, encode_version, Command, PropagateWrite};
use crate::store::{ObjectStore, Value};

/// Number of lock stripes ordering client writes at the head
const WRITE_STRIPES: usize = 64;

/// Acknowledgment of a client write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAck {
    pub key: String,
    /// Version the head assigned to the write
    pub version: u64,
    pub message: String,
}

/// One member of the chain
///
/// ## Concurrency Model
///
/// Handlers take `&self` and run on many worker threads at once. The only
/// shared mutable state is the object store (single RwLock), which is never
/// held across a downstream call.
///
/// Client writes at the head take one of `WRITE_STRIPES` locks, picked by key
/// hash, for the whole store-propagate-commit sequence. Writes to one key thus
/// reach the successor in version order, while writes to keys on different
/// stripes propagate in parallel.
pub struct ChainNode {
    /// Position in the chain
    index: usize,

    /// Fixed for the node's lifetime
    role: Role,

    /// Shared, immutable chain table
    topology: Arc<ChainTopology>,

    /// Local versioned objects
    store: ObjectStore,

    /// Calls to the successor and the tail
    transport: Arc<dyn ChainTransport>,

    /// Directory holding the WAL, if durable
    data_dir: Option<PathBuf>,

    /// Orders same-key client writes
    write_stripes: Vec<Mutex<()>>,
}

impl ChainNode {
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open a durable node
    ///
    /// On startup:
    /// 1. Resolve the role from `config.node_index`
    /// 2. Create the data directory
    /// 3. Replay the WAL, then attach it for new writes
    pub fn open(
        config: &Config,
        topology: Arc<ChainTopology>,
        transport: Arc<dyn ChainTransport>,
    ) -> Result<Self> {
        resolve_role(&topology, config.node_index)?;

        fs::create_dir_all(&config.data_dir)?;
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let store = ObjectStore::open(&wal_path, config.wal_sync_strategy)?;
        let mut node = Self::with_store(config.node_index, topology, transport, store)?;
        node.data_dir = Some(config.data_dir.clone());

        tracing::info!(
            "Opened {} node {} of {} ({} keys, {} dirty)",
            node.role,
            node.index,
            node.topology.len(),
            node.store.len(),
            node.store.dirty_count()
        );

        Ok(node)
    }

    /// Create a node whose store lives only in memory
    pub fn in_memory(
        index: usize,
        topology: Arc<ChainTopology>,
        transport: Arc<dyn ChainTransport>,
    ) -> Result<Self> {
        Self::with_store(index, topology, transport, ObjectStore::new())
    }

    /// Create a node around an existing store
    pub fn with_store(
        index: usize,
        topology: Arc<ChainTopology>,
        transport: Arc<dyn ChainTransport>,
        store: ObjectStore,
    ) -> Result<Self> {
        let role = resolve_role(&topology, index)?;
        Ok(Self {
            index,
            role,
            topology,
            store,
            transport,
            data_dir: None,
            write_stripes: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    /// Route a wire command to its handler
    ///
    /// Returns the response payload for the command.
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self
                .handle_get(&key)
                .map(|value| Some(value.value.into_bytes())),
            Command::Set { key, value } => self
                .handle_set(&key, &value)
                .map(|ack| Some(ack.message.into_bytes())),
            Command::Propagate(write) => self
                .handle_propagated_write(write)
                .map(|_| Some(b"ok".to_vec())),
            Command::VersionQuery { key } => self
                .handle_version_query(&key)
                .map(|version| Some(encode_version(version))),
            Command::FetchCommitted { key } => {
                let value = self.handle_fetch_committed(&key)?;
                Ok(Some(encode_value(&value)?))
            }
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Accept a client write (head, or the only node of a one-node chain)
    ///
    /// Steps:
    /// 1. Validate key and value
    /// 2. Assign the next version and store it (WAL first)
    /// 3. Propagate to the successor and wait for its ack
    /// 4. Commit locally
    ///
    /// If step 2 fails nothing is stored or sent. If step 3 fails the pending
    /// value stays in place and the error is returned to the client. Steps 2
    /// to 4 run under the key's write stripe, so a second write to the same
    /// key waits until the first one is committed or has failed.
    pub fn handle_set(&self, key: &str, value: &str) -> Result<WriteAck> {
        if !self.accepts_writes() {
            return Err(CraqError::WrongRole {
                operation: "set",
                role: self.role,
            });
        }
        validate_write(key, value)?;

        let _ordered = self.write_stripe(key).lock();

        let stored = self.store.set_next(key, value)?;
        tracing::debug!("handle set {}={} (v={})", key, value, stored.version);

        if self.role == Role::Head {
            self.forward(&PropagateWrite::new(key, &stored))?;
        }

        // The rest of the chain has committed; only the local record is missing
        self.store.commit(key, stored.version).map_err(|e| {
            tracing::warn!(
                "{} (v={}) is committed downstream but the local commit failed: {}",
                key,
                stored.version,
                e
            );
            e
        })?;

        Ok(WriteAck {
            key: key.to_string(),
            version: stored.version,
            message: format!("wrote value for {}={}", key, value),
        })
    }

    /// Accept a write from the predecessor (middle and tail)
    ///
    /// The version and timestamp are stored exactly as received. A middle
    /// node forwards the write and commits only after the forward succeeds;
    /// the tail commits at once.
    pub fn handle_propagated_write(&self, write: PropagateWrite) -> Result<()> {
        if !matches!(self.role, Role::Middle | Role::Tail) {
            return Err(CraqError::WrongRole {
                operation: "propagate",
                role: self.role,
            });
        }
        validate_write(&write.key, &write.value)?;

        self.store
            .set_at(&write.key, &write.value, write.version, write.timestamp)?;
        tracing::debug!("handle propagate write {}={} (v={})", write.key, write.value, write.version);

        if self.role == Role::Middle {
            self.forward(&write)?;
        }

        self.store.commit(&write.key, write.version)?;
        Ok(())
    }

    fn write_stripe(&self, key: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.write_stripes[hasher.finish() as usize % self.write_stripes.len()]
    }

    /// Send a write to the successor and wait for its commit
    fn forward(&self, write: &PropagateWrite) -> Result<()> {
        let next = self.topology.successor(self.index).ok_or_else(|| {
            CraqError::Topology(format!("{} node {} has no successor", self.role, self.index))
        })?;

        self.transport.propagate(next, write).map_err(|e| {
            tracing::warn!(
                "failed to propagate {} (v={}) to {}: {}",
                write.key,
                write.version,
                next.addr,
                e
            );
            downstream_error(next, e)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read the committed value of `key`
    ///
    /// Clean objects are answered locally. For a dirty object the tail is
    /// asked which version is committed; that version is returned from local
    /// history when retained, otherwise the value is fetched from the tail.
    pub fn handle_get(&self, key: &str) -> Result<Value> {
        validate_key(key)?;
        tracing::trace!("handle get key={}", key);

        let object = self.store.get(key)?;
        if !object.is_dirty() {
            return Ok(object.latest_value().clone());
        }

        if self.role == Role::Tail {
            return object.committed_value().cloned().ok_or(CraqError::KeyNotFound);
        }

        let tail = self.tail()?;
        let version = self
            .transport
            .query_version(tail, key)
            .map_err(|e| downstream_error(tail, e))?;

        if let Some(value) = object.value_at_version(version) {
            return Ok(value.clone());
        }

        tracing::debug!(
            "version {} of {} is not retained locally, fetching from tail",
            version,
            key
        );
        self.transport
            .fetch_committed(tail, key)
            .map_err(|e| downstream_error(tail, e))
    }

    /// Committed version of `key` (tail only)
    pub fn handle_version_query(&self, key: &str) -> Result<u64> {
        self.require_tail("version query")?;
        validate_key(key)?;
        self.store.committed_version(key)
    }

    /// Committed value of `key` (tail only)
    pub fn handle_fetch_committed(&self, key: &str) -> Result<Value> {
        self.require_tail("fetch committed")?;
        validate_key(key)?;
        self.store.committed_value(key)
    }

    fn require_tail(&self, operation: &'static str) -> Result<()> {
        if self.role != Role::Tail {
            return Err(CraqError::WrongRole {
                operation,
                role: self.role,
            });
        }
        Ok(())
    }

    fn tail(&self) -> Result<&NodeInfo> {
        self.topology
            .tail()
            .ok_or_else(|| CraqError::Topology("chain has no tail".to_string()))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// This node's entry in the chain table
    pub fn info(&self) -> Option<&NodeInfo> {
        self.topology.node(self.index)
    }

    pub fn topology(&self) -> &ChainTopology {
        &self.topology
    }

    /// The local object store (for inspection and testing)
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Data directory, `None` for in-memory nodes
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Whether client writes enter the chain here
    pub fn accepts_writes(&self) -> bool {
        match self.role {
            Role::Head => true,
            Role::Tail => self.topology.len() == 1,
            Role::Middle | Role::Unknown => false,
        }
    }
}

fn resolve_role(topology: &ChainTopology, index: usize) -> Result<Role> {
    match topology.role(index) {
        Role::Unknown => Err(CraqError::UnknownRole {
            index,
            chain_len: topology.len(),
        }),
        role => Ok(role),
    }
}

/// Keep `KeyNotFound` from the tail; anything else means the call failed
fn downstream_error(target: &NodeInfo, err: CraqError) -> CraqError {
    match err {
        CraqError::KeyNotFound => CraqError::KeyNotFound,
        CraqError::Propagation(_) => err,
        other => CraqError::Propagation(format!("{} ({}): {}", target.id, target.addr, other)),
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CraqError::InvalidArgument("key cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_write(key: &str, value: &str) -> Result<()> {
    validate_key(key)?;
    if value.is_empty() {
        return Err(CraqError::InvalidArgument("value cannot be empty".to_string()));
    }
    Ok(())
}
