//! Tree nodes and their persisted variable data
//!
//! Every committed message node carries either a full [`ScopedState`]
//! snapshot or the [`VariableChange`]s against its parent, plus
//! [`VariableMetadata`]. [`VariableTree`] indexes nodes by id and resolves
//! the root-to-node path a restore needs.

use crate::diff::VariableChange;
use crate::error::SnapshotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display, Formatter};
use vbe_store::ScopedState;

/// Stable node identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create node id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Bookkeeping stored next to a node's variable data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMetadata {
    /// Commit time
    pub timestamp: DateTime<Utc>,
    /// Whether the node changed anything relative to its parent
    pub has_changes: bool,
    /// `true` when the node stores a diff and depends on its parent
    pub parent_snapshot: bool,
    /// Serialized byte size of the stored snapshot or diff
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Hex Blake3 checksum of the stored snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// How a node stores its variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Full state
    Snapshot,
    /// Changes against the parent
    Diff,
    /// Neither; the node's data is missing
    Empty,
}

/// A message node as persisted by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// This node
    pub node_id: NodeId,
    /// Parent node, `None` for a root
    #[serde(default)]
    pub parent_node_id: Option<NodeId>,
    /// Full state, for snapshot nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_snapshot: Option<ScopedState>,
    /// Changes against the parent, for diff nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_changes: Option<Vec<VariableChange>>,
    /// Bookkeeping
    pub variable_metadata: VariableMetadata,
}

impl TreeNode {
    /// Storage kind; a snapshot wins when both are present
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match (&self.variable_snapshot, &self.variable_changes) {
            (Some(_), _) => NodeKind::Snapshot,
            (None, Some(_)) => NodeKind::Diff,
            (None, None) => NodeKind::Empty,
        }
    }

    /// True if the stored snapshot matches its recorded checksum
    ///
    /// Snapshots without a recorded checksum are trusted.
    #[must_use]
    pub fn snapshot_intact(&self) -> bool {
        let Some(snapshot) = &self.variable_snapshot else {
            return false;
        };
        match &self.variable_metadata.checksum {
            None => true,
            Some(stored) => crate::StateChecksum::of_state(snapshot)
                .is_ok_and(|sum| sum.matches(stored)),
        }
    }

    /// Drop the stored snapshot, as a host pruning storage would
    #[must_use]
    pub fn without_snapshot(mut self) -> Self {
        self.variable_snapshot = None;
        self
    }
}

impl AsRef<Self> for TreeNode {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// Nodes indexed by id
#[derive(Debug, Clone, Default)]
pub struct VariableTree {
    nodes: BTreeMap<NodeId, TreeNode>,
}

impl VariableTree {
    /// Empty tree
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a flat node list
    ///
    /// # Errors
    /// Returns error on duplicate ids
    pub fn from_nodes(nodes: impl IntoIterator<Item = TreeNode>) -> Result<Self, SnapshotError> {
        let mut tree = Self::new();
        for node in nodes {
            tree.insert(node)?;
        }
        Ok(tree)
    }

    /// Add a committed node
    ///
    /// # Errors
    /// Returns error if the id is already taken; committed nodes are never replaced
    pub fn insert(&mut self, node: TreeNode) -> Result<(), SnapshotError> {
        if self.nodes.contains_key(&node.node_id) {
            return Err(SnapshotError::DuplicateNode(node.node_id));
        }
        self.nodes.insert(node.node_id.clone(), node);
        Ok(())
    }

    /// Look up a node
    #[inline]
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if there are no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, ordered by id
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Root-first path ending at `id`
    ///
    /// # Errors
    /// Returns error if `id` is unknown, a parent link dangles, or the links cycle
    pub fn path_to(&self, id: &NodeId) -> Result<Vec<&TreeNode>, SnapshotError> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            if !seen.insert(current) {
                return Err(SnapshotError::broken_topology(current.clone(), "parent links form a cycle"));
            }
            let node = self.nodes.get(current).ok_or_else(|| {
                if current == id {
                    SnapshotError::NodeNotFound(id.clone())
                } else {
                    SnapshotError::broken_topology(current.clone(), "parent not in tree")
                }
            })?;
            path.push(node);
            cursor = node.parent_node_id.as_ref();
        }

        path.reverse();
        Ok(path)
    }
}
