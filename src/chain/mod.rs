//! Chain Module
//!
//! The fixed, ordered list of nodes and the role each position plays.
//!
//! ```text
//!  writes ──► [ head ] ──► [ middle ] ──► ... ──► [ tail ]
//!             index 0                            index n-1
//!  acks   ◄──────────────────────────────────────────┘
//! ```

mod topology;

pub use topology::{ChainTopology, NodeInfo};

use std::fmt;

/// Role of a node, derived from its position in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Entry point for writes; assigns versions
    Head,

    /// Stores and forwards writes
    Middle,

    /// Commits immediately; the authority for committed versions
    Tail,

    /// Position outside the chain
    Unknown,
}

impl Role {
    /// Role of position `index` in a chain of `len` nodes
    ///
    /// A single-node chain is its own tail.
    pub fn for_position(index: usize, len: usize) -> Self {
        if index >= len {
            Role::Unknown
        } else if index == len - 1 {
            Role::Tail
        } else if index == 0 {
            Role::Head
        } else {
            Role::Middle
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Head => "head",
            Role::Middle => "middle",
            Role::Tail => "tail",
            Role::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
