//! Error types for snapshot/diff operations

use crate::node::NodeId;

/// Errors from snapshot creation, restoration and repair
///
/// Broken chains are not errors; they are reported through
/// [`ChainValidation`](crate::ChainValidation).
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The path holds no nodes
    #[error("node path is empty")]
    EmptyPath,

    /// Requested node does not appear in the supplied path
    #[error("node '{0}' is not in the supplied path")]
    NodeNotInPath(NodeId),

    /// Repair found no intact snapshot anywhere in the path
    #[error("no intact snapshot among {searched} nodes")]
    NoSnapshotAncestor { searched: usize },

    /// Parent links do not form a path back to a root
    #[error("broken topology at node '{node}': {reason}")]
    BrokenTopology { node: NodeId, reason: String },

    /// Node id already present in the tree
    #[error("node '{0}' already exists")]
    DuplicateNode(NodeId),

    /// Unknown node id
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    /// Snapshot policy value out of range
    #[error("invalid snapshot config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// State could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Create broken topology error
    pub fn broken_topology(node: NodeId, reason: impl Into<String>) -> Self {
        Self::BrokenTopology {
            node,
            reason: reason.into(),
        }
    }
}
