//! Chain topology
//!
//! Loaded once from a YAML chain table:
//! ```yaml
//! chains:
//!   - id: node-a
//!     addr: 127.0.0.1:8080
//!   - id: node-b
//!     addr: 127.0.0.1:8081
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CraqError, Result};
use super::Role;

/// A single chain member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub addr: String,
}

impl NodeInfo {
    pub fn new(id: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            addr: addr.into(),
        }
    }
}

/// Ordered chain members, head first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTopology {
    #[serde(rename = "chains")]
    nodes: Vec<NodeInfo>,
}

impl ChainTopology {
    /// Build a topology from an ordered node list
    pub fn new(nodes: Vec<NodeInfo>) -> Result<Self> {
        let topology = Self { nodes };
        topology.validate()?;
        Ok(topology)
    }

    /// Parse a YAML chain table
    pub fn parse(source: &str) -> Result<Self> {
        let topology: Self = serde_yaml::from_str(source)
            .map_err(|e| CraqError::Topology(format!("invalid chain table: {}", e)))?;
        topology.validate()?;
        Ok(topology)
    }

    /// Read and parse a YAML chain table file
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(CraqError::Topology("chain has no nodes".to_string()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.addr.is_empty() {
                return Err(CraqError::Topology(format!("node '{}' has no address", node.id)));
            }
            if !seen.insert(node.id.as_str()) {
                return Err(CraqError::Topology(format!("duplicate node id '{}'", node.id)));
            }
        }
        Ok(())
    }

    /// Number of nodes in the chain
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a validated topology
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&NodeInfo> {
        self.nodes.get(index)
    }

    /// Role of the node at `index`; `Unknown` when out of range
    pub fn role(&self, index: usize) -> Role {
        Role::for_position(index, self.nodes.len())
    }

    /// Next hop for writes leaving `index`
    pub fn successor(&self, index: usize) -> Option<&NodeInfo> {
        index.checked_add(1).and_then(|next| self.nodes.get(next))
    }

    pub fn head(&self) -> Option<&NodeInfo> {
        self.nodes.first()
    }

    pub fn tail(&self) -> Option<&NodeInfo> {
        self.nodes.last()
    }

    /// Index of the node with the given id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CraqError::Serialization(e.to_string()))
    }
}
