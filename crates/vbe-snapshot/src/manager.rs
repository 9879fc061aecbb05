//! Snapshot/diff decisions and branch state reconstruction
//!
//! [`SnapshotManager`] decides, per committed node, whether to store a full
//! snapshot or a diff against the parent's resolved state, and rebuilds the
//! state of any node from its root-first path.
//!
//! # Snapshot policy
//!
//! A node gets a full snapshot when any of these hold, checked in order:
//! forced by the caller, no parent, parent state not supplied, the diff is
//! not representable, the diff has more than `compression_threshold`
//! changes, or its ordinal is a multiple of `max_snapshot_interval`.
//!
//! Tree callers pass the node's depth as its ordinal. Without one the
//! manager falls back to its own commit counter, which only tracks depth
//! for a single linear chain.

use crate::checksum::StateChecksum;
use crate::config::SnapshotConfig;
use crate::diff::{apply_changes, compute_state_diff, StateDiff};
use crate::error::SnapshotError;
use crate::node::{NodeId, NodeKind, TreeNode, VariableMetadata};
use crate::report::{ChainValidation, RepairSummary, RestoreSummary, StorageStatistics};
use chrono::Utc;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, info, warn};
use vbe_store::{ScopedState, VariableStore};

/// Inputs for committing one node
#[derive(Debug, Clone)]
pub struct SnapshotRequest<'a> {
    node_id: NodeId,
    parent_node_id: Option<NodeId>,
    parent_state: Option<&'a ScopedState>,
    force_snapshot: bool,
    ordinal: Option<usize>,
}

impl<'a> SnapshotRequest<'a> {
    /// Request for a root node
    #[must_use]
    pub fn root(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            parent_node_id: None,
            parent_state: None,
            force_snapshot: false,
            ordinal: None,
        }
    }

    /// Request for a child of `parent_node_id`, whose resolved state is `parent_state`
    #[must_use]
    pub fn child(
        node_id: impl Into<NodeId>,
        parent_node_id: impl Into<NodeId>,
        parent_state: &'a ScopedState,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            parent_node_id: Some(parent_node_id.into()),
            parent_state: Some(parent_state),
            force_snapshot: false,
            ordinal: None,
        }
    }

    /// Child whose parent state is unknown; always stored as a snapshot
    #[must_use]
    pub fn orphan(node_id: impl Into<NodeId>, parent_node_id: impl Into<NodeId>) -> Self {
        Self {
            parent_node_id: Some(parent_node_id.into()),
            ..Self::root(node_id)
        }
    }

    /// Always store a full snapshot
    #[must_use]
    pub fn force(mut self) -> Self {
        self.force_snapshot = true;
        self
    }

    /// Use an explicit ordinal (normally the node's depth) instead of the
    /// manager's counter
    #[must_use]
    pub fn at_ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Node being committed
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }
}

/// Why a node was stored as a full snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    /// Caller asked for it
    Forced,
    /// Node has no parent
    Root,
    /// Parent's resolved state was not supplied
    MissingParentState,
    /// Some key cannot be expressed as a path
    Unrepresentable,
    /// Diff exceeded the compression threshold
    Threshold,
    /// Ordinal hit the snapshot interval
    Interval,
}

impl Display for SnapshotReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Forced => "forced",
            Self::Root => "root",
            Self::MissingParentState => "missing parent state",
            Self::Unrepresentable => "unrepresentable diff",
            Self::Threshold => "compression threshold",
            Self::Interval => "snapshot interval",
        };
        f.write_str(s)
    }
}

/// State rebuilt from a path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedState {
    /// Resulting state
    pub state: ScopedState,
    /// Snapshots loaded
    pub snapshots_applied: usize,
    /// Diff entries applied
    pub changes_applied: usize,
    /// Diff nodes replayed before any snapshot
    pub orphan_diffs: Vec<NodeId>,
    /// Nodes with neither snapshot nor diff
    pub empty_nodes: Vec<NodeId>,
}

impl ResolvedState {
    /// True if the path could not be resolved faithfully
    #[inline]
    #[must_use]
    pub fn is_broken(&self) -> bool {
        !self.orphan_diffs.is_empty() || !self.empty_nodes.is_empty()
    }
}

/// Replay a root-first path without touching any store
///
/// Snapshots replace the accumulator; diffs apply in order. Diffs seen before
/// any snapshot replay onto the empty state and are reported.
#[must_use]
pub fn resolve_state<P: AsRef<TreeNode>>(path: &[P]) -> ResolvedState {
    let mut resolved = ResolvedState::default();
    let mut anchored = false;

    for node in path {
        let node = node.as_ref();
        match (&node.variable_snapshot, &node.variable_changes) {
            (Some(snapshot), _) => {
                resolved.state = snapshot.clone();
                resolved.snapshots_applied += 1;
                anchored = true;
            }
            (None, Some(changes)) => {
                if !anchored {
                    warn!(node = %node.node_id, "Diff node precedes any snapshot; replaying onto empty state");
                    resolved.orphan_diffs.push(node.node_id.clone());
                }
                resolved.changes_applied += apply_changes(&mut resolved.state, changes);
            }
            (None, None) => {
                warn!(node = %node.node_id, "Node has no variable data; skipping");
                resolved.empty_nodes.push(node.node_id.clone());
            }
        }
    }

    resolved
}

/// Commits node variable data and reconstructs branch state
#[derive(Debug, Clone, Default)]
pub struct SnapshotManager {
    config: SnapshotConfig,
    committed: usize,
}

impl SnapshotManager {
    /// Create manager with a policy
    #[must_use]
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            config,
            committed: 0,
        }
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Nodes committed so far; the next default ordinal
    #[inline]
    #[must_use]
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Compute the variable data for a new node from the store's current state
    ///
    /// # Errors
    /// Returns error if the state or diff cannot be serialized for sizing
    pub fn create_variable_snapshot(
        &mut self,
        store: &VariableStore,
        request: SnapshotRequest<'_>,
    ) -> Result<TreeNode, SnapshotError> {
        let ordinal = request.ordinal.unwrap_or(self.committed);
        let timestamp = Utc::now();
        let current = store.export_snapshot();

        let diff = match (&request.parent_node_id, request.parent_state) {
            (Some(_), Some(parent)) => Some(compute_state_diff(parent, &current, timestamp)),
            _ => None,
        };

        let node = match self.snapshot_reason(&request, diff.as_ref(), ordinal) {
            Some(reason) => {
                let bytes = serde_json::to_vec(&current)?;
                let checksum = StateChecksum::compute(&bytes);
                let has_changes = diff.as_ref().map_or(!current.is_empty(), |d| !d.is_empty());
                info!(
                    node = %request.node_id,
                    ordinal,
                    %reason,
                    size = bytes.len(),
                    checksum = %checksum.short(),
                    "Stored full variable snapshot"
                );
                TreeNode {
                    node_id: request.node_id,
                    parent_node_id: request.parent_node_id,
                    variable_snapshot: Some(current),
                    variable_changes: None,
                    variable_metadata: VariableMetadata {
                        timestamp,
                        has_changes,
                        parent_snapshot: false,
                        size: Some(bytes.len()),
                        checksum: Some(checksum.to_string()),
                    },
                }
            }
            None => {
                let changes = diff.map(|d| d.changes).unwrap_or_default();
                let size = serde_json::to_vec(&changes)?.len();
                info!(
                    node = %request.node_id,
                    ordinal,
                    changes = changes.len(),
                    size,
                    "Stored variable diff"
                );
                TreeNode {
                    node_id: request.node_id,
                    parent_node_id: request.parent_node_id,
                    variable_snapshot: None,
                    variable_metadata: VariableMetadata {
                        timestamp,
                        has_changes: !changes.is_empty(),
                        parent_snapshot: true,
                        size: Some(size),
                        checksum: None,
                    },
                    variable_changes: Some(changes),
                }
            }
        };

        self.committed += 1;
        Ok(node)
    }

    fn snapshot_reason(
        &self,
        request: &SnapshotRequest<'_>,
        diff: Option<&StateDiff>,
        ordinal: usize,
    ) -> Option<SnapshotReason> {
        if request.force_snapshot {
            return Some(SnapshotReason::Forced);
        }
        if request.parent_node_id.is_none() {
            return Some(SnapshotReason::Root);
        }
        let Some(diff) = diff else {
            return Some(SnapshotReason::MissingParentState);
        };
        if !diff.representable {
            return Some(SnapshotReason::Unrepresentable);
        }
        if diff.changes.len() > self.config.compression_threshold {
            return Some(SnapshotReason::Threshold);
        }
        let interval = self.config.max_snapshot_interval;
        if interval > 0 && ordinal % interval == 0 {
            return Some(SnapshotReason::Interval);
        }
        None
    }

    /// Rebuild the state at `node_id` and load it into `store`
    ///
    /// `path` is root-first and is truncated at `node_id`. The store's
    /// contents are replaced and its ledger cleared.
    ///
    /// # Errors
    /// Returns error if the path is empty or does not contain `node_id`
    pub fn restore_variable_state<P: AsRef<TreeNode>>(
        &self,
        store: &mut VariableStore,
        node_id: &NodeId,
        path: &[P],
    ) -> Result<RestoreSummary, SnapshotError> {
        if path.is_empty() {
            return Err(SnapshotError::EmptyPath);
        }
        let end = path
            .iter()
            .position(|n| n.as_ref().node_id == *node_id)
            .ok_or_else(|| SnapshotError::NodeNotInPath(node_id.clone()))?;

        let resolved = resolve_state(&path[..=end]);
        let summary = RestoreSummary {
            node_id: node_id.clone(),
            nodes_replayed: end + 1,
            snapshots_applied: resolved.snapshots_applied,
            changes_applied: resolved.changes_applied,
            broken_chain: resolved.is_broken(),
        };
        store.load_snapshot(resolved.state);

        info!(
            node = %node_id,
            nodes = summary.nodes_replayed,
            snapshots = summary.snapshots_applied,
            changes = summary.changes_applied,
            broken = summary.broken_chain,
            "Restored variable state"
        );
        Ok(summary)
    }

    /// Check that every node in `path` can be resolved
    #[must_use]
    pub fn validate_variable_state<P: AsRef<TreeNode>>(&self, path: &[P]) -> ChainValidation {
        let mut validation = ChainValidation::default();
        let mut anchored = false;

        for node in path {
            let node = node.as_ref();
            match node.kind() {
                NodeKind::Snapshot if node.snapshot_intact() => anchored = true,
                NodeKind::Snapshot => {
                    validation.corrupted_snapshots.push(node.node_id.clone());
                    anchored = false;
                }
                NodeKind::Diff if anchored => {}
                NodeKind::Diff | NodeKind::Empty => {
                    validation.missing_snapshots.push(node.node_id.clone());
                }
            }
        }

        validation.broken_chain = !validation.missing_snapshots.is_empty();
        validation.is_valid = !validation.broken_chain && validation.corrupted_snapshots.is_empty();
        debug!(
            nodes = path.len(),
            valid = validation.is_valid,
            missing = validation.missing_snapshots.len(),
            corrupted = validation.corrupted_snapshots.len(),
            "Validated variable chain"
        );
        validation
    }

    /// Rebuild the state at the end of `path` from its last intact snapshot
    ///
    /// Scans backward for a snapshot whose checksum still matches, replays
    /// the diffs after it, and loads the result into `store`.
    ///
    /// # Errors
    /// Returns error if the path is empty or holds no intact snapshot
    pub fn repair_variable_state_chain<P: AsRef<TreeNode>>(
        &self,
        store: &mut VariableStore,
        path: &[P],
    ) -> Result<RepairSummary, SnapshotError> {
        if path.is_empty() {
            return Err(SnapshotError::EmptyPath);
        }
        let Some(anchor_at) = path.iter().rposition(|n| n.as_ref().snapshot_intact()) else {
            warn!(nodes = path.len(), "Chain repair found no intact snapshot");
            return Err(SnapshotError::NoSnapshotAncestor {
                searched: path.len(),
            });
        };

        let anchor = path[anchor_at].as_ref();
        let mut state = anchor.variable_snapshot.clone().unwrap_or_default();
        let mut replayed = 0;
        let mut changes_applied = 0;
        for node in &path[anchor_at + 1..] {
            let node = node.as_ref();
            match &node.variable_changes {
                Some(changes) => {
                    changes_applied += apply_changes(&mut state, changes);
                    replayed += 1;
                }
                None => warn!(node = %node.node_id, "No diff to replay during repair; skipping"),
            }
        }
        store.load_snapshot(state);

        let summary = RepairSummary {
            anchor: anchor.node_id.clone(),
            nodes_replayed: replayed,
            changes_applied,
        };
        info!(
            anchor = %summary.anchor,
            nodes = summary.nodes_replayed,
            changes = summary.changes_applied,
            "Repaired variable chain"
        );
        Ok(summary)
    }

    /// Storage use of the nodes in `path`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get_storage_statistics<P: AsRef<TreeNode>>(&self, path: &[P]) -> StorageStatistics {
        let mut stats = StorageStatistics {
            node_count: path.len(),
            ..StorageStatistics::default()
        };
        let mut diff_bytes = 0;

        for node in path {
            let node = node.as_ref();
            let size = node.variable_metadata.size.unwrap_or(0);
            stats.total_size += size;
            match node.kind() {
                NodeKind::Snapshot => stats.snapshot_count += 1,
                NodeKind::Diff => {
                    stats.diff_count += 1;
                    diff_bytes += size;
                }
                NodeKind::Empty => {}
            }
        }

        if stats.diff_count > 0 {
            stats.average_diff_size = diff_bytes as f64 / stats.diff_count as f64;
        }
        let stored = stats.diff_count + stats.snapshot_count;
        if stored > 0 {
            stats.compression_ratio = stats.diff_count as f64 / stored as f64;
        }
        stats
    }
}
