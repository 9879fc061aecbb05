//! Testing utilities for VBE workspace
//!
//! Shared test helpers and fixtures.

#![allow(missing_docs)]

use chrono::Utc;
use serde_json::Value;
use vbe_snapshot::{
    NodeId, SnapshotManager, SnapshotRequest, StateChecksum, TreeNode, VariableChange,
    VariableMetadata,
};
use vbe_store::{Operation, Scope, ScopedState, VariableStore};

pub fn scoped(global: Value) -> ScopedState {
    ScopedState::from_global(global)
}

fn metadata(parent_snapshot: bool, has_changes: bool) -> VariableMetadata {
    VariableMetadata {
        timestamp: Utc::now(),
        has_changes,
        parent_snapshot,
        size: None,
        checksum: None,
    }
}

/// Snapshot node with a valid checksum
pub fn snapshot_node(id: &str, parent: Option<&str>, state: ScopedState) -> TreeNode {
    let mut meta = metadata(false, true);
    meta.checksum = Some(StateChecksum::of_state(&state).unwrap().to_string());
    TreeNode {
        node_id: id.into(),
        parent_node_id: parent.map(NodeId::from),
        variable_snapshot: Some(state),
        variable_changes: None,
        variable_metadata: meta,
    }
}

pub fn diff_node(id: &str, parent: &str, changes: Vec<VariableChange>) -> TreeNode {
    TreeNode {
        node_id: id.into(),
        parent_node_id: Some(parent.into()),
        variable_metadata: metadata(true, !changes.is_empty()),
        variable_snapshot: None,
        variable_changes: Some(changes),
    }
}

pub fn change(path: &str, operation: Operation, old_value: Value, new_value: Value) -> VariableChange {
    VariableChange {
        scope: Scope::Global,
        path: path.to_string(),
        old_value,
        new_value,
        operation,
        timestamp: Utc::now(),
        array_delta: None,
    }
}

/// Commit each state as a child of the previous one, ids `n0`, `n1`, ...
pub fn commit_linear(manager: &mut SnapshotManager, states: &[ScopedState]) -> Vec<TreeNode> {
    let mut store = VariableStore::new();
    let mut nodes = Vec::with_capacity(states.len());
    for (i, state) in states.iter().enumerate() {
        let request = match i {
            0 => SnapshotRequest::root("n0"),
            _ => SnapshotRequest::child(format!("n{i}"), format!("n{}", i - 1), &states[i - 1]),
        };
        store.load_snapshot(state.clone());
        nodes.push(
            manager
                .create_variable_snapshot(&store, request.at_ordinal(i))
                .unwrap(),
        );
    }
    nodes
}
