//! Result types for restore, validation, repair and statistics

use crate::node::NodeId;
use serde::Serialize;

/// Outcome of walking a path for integrity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidation {
    /// No missing or corrupted snapshots
    pub is_valid: bool,
    /// Nodes that cannot be resolved: diffs before any snapshot, and nodes with no data
    pub missing_snapshots: Vec<NodeId>,
    /// Some node depends on state the path cannot provide
    pub broken_chain: bool,
    /// Snapshots whose content no longer matches their checksum
    pub corrupted_snapshots: Vec<NodeId>,
}

/// What a restore did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    /// Restored node
    pub node_id: NodeId,
    /// Nodes walked, root through target
    pub nodes_replayed: usize,
    /// Snapshots loaded along the way
    pub snapshots_applied: usize,
    /// Diff entries applied along the way
    pub changes_applied: usize,
    /// A diff came before any snapshot or a node had no data
    pub broken_chain: bool,
}

/// What a repair did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSummary {
    /// Node whose snapshot the rebuild started from
    pub anchor: NodeId,
    /// Diff nodes replayed after the anchor
    pub nodes_replayed: usize,
    /// Diff entries applied
    pub changes_applied: usize,
}

/// Storage use along a path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatistics {
    /// Nodes in the path
    pub node_count: usize,
    /// Nodes storing a full snapshot
    pub snapshot_count: usize,
    /// Nodes storing only a diff
    pub diff_count: usize,
    /// Sum of recorded sizes in bytes
    pub total_size: usize,
    /// Mean recorded size of diff nodes
    pub average_diff_size: f64,
    /// `diff_count / (diff_count + snapshot_count)`, 0 when both are 0
    pub compression_ratio: f64,
}
