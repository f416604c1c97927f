//! Command definitions
//!
//! Represents requests from clients and from other chain nodes.

use serde::{Deserialize, Serialize};

use crate::store::Value;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Propagate = 0x03,
    Version = 0x04,
    Fetch = 0x05,
    Ping = 0x06,
}

/// A write travelling down the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagateWrite {
    pub key: String,
    pub value: String,
    /// Assigned by the head, never recomputed downstream
    pub version: u64,
    pub timestamp: u64,
}

impl PropagateWrite {
    pub fn new(key: impl Into<String>, value: &Value) -> Self {
        Self {
            key: key.into(),
            value: value.value.clone(),
            version: value.version,
            timestamp: value.timestamp,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read a key (any node)
    Get { key: String },

    /// Client write (head only)
    Set { key: String, value: String },

    /// Node-to-node write propagation (middle and tail)
    Propagate(PropagateWrite),

    /// Committed version of a key (tail only)
    VersionQuery { key: String },

    /// Committed value of a key (tail only)
    FetchCommitted { key: String },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Propagate(_) => CommandType::Propagate,
            Command::VersionQuery { .. } => CommandType::Version,
            Command::FetchCommitted { .. } => CommandType::Fetch,
            Command::Ping => CommandType::Ping,
        }
    }
}
