//! Per-session variable engine
//!
//! [`VariableEngine`] owns one live store together with the command
//! processor and snapshot manager that act on it. Hosts create one engine
//! per conversation tree and pass it explicitly.

use crate::config::EngineConfig;
use crate::error::EngineError;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write as _;
use tracing::{error, info};
use vbe_command::{CommandProcessor, ProcessOutcome};
use vbe_snapshot::{
    resolve_state, ChainValidation, NodeId, RepairSummary, RestoreSummary, SnapshotManager,
    SnapshotRequest, StorageStatistics, TreeNode, VariableTree,
};
use vbe_store::{flatten, ChangeRecord, Scope, ScopedState, VariableStore};

/// A variable whose path or value matched a search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Scope holding the variable
    pub scope: Scope,
    /// Dotted path
    pub path: String,
    /// Leaf value
    pub value: Value,
}

/// Store, processor and snapshot manager for one session
#[derive(Debug)]
pub struct VariableEngine {
    store: VariableStore,
    processor: CommandProcessor,
    snapshots: SnapshotManager,
    config: EngineConfig,
}

impl Default for VariableEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            store: VariableStore::with_ledger(config.ledger.build()),
            processor: CommandProcessor::new(config.parser.clone()),
            snapshots: SnapshotManager::new(config.snapshot.clone()),
            config,
        }
    }
}

impl VariableEngine {
    /// Create engine from a validated configuration
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if let Err(e) = config.validate() {
            error!(error = %e, "Rejected engine configuration");
            return Err(e.into());
        }
        Ok(Self {
            store: VariableStore::with_ledger(config.ledger.build()),
            processor: CommandProcessor::new(config.parser.clone()),
            snapshots: SnapshotManager::new(config.snapshot.clone()),
            config,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Mutable access to the live store
    #[inline]
    pub fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.store
    }

    /// The snapshot manager
    #[inline]
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Global-scope read
    #[inline]
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.store.get(Scope::Global, path)
    }

    /// Global-scope write; `false` if the path is invalid or blocked
    pub fn set(&mut self, path: &str, value: Value) -> bool {
        self.store.set(Scope::Global, path, value)
    }

    /// Global-scope increment; returns the new value
    pub fn increment(&mut self, path: &str, delta: impl Into<Value>) -> Option<Value> {
        self.store.increment(Scope::Global, path, delta)
    }

    /// Global-scope delete; returns the removed value
    pub fn delete(&mut self, path: &str) -> Option<Value> {
        self.store.delete(Scope::Global, path)
    }

    /// Apply every mutation instruction in generated text
    ///
    /// The returned outcome carries the text with instruction syntax removed.
    pub fn apply_generated_text(&mut self, text: &str) -> ProcessOutcome {
        let outcome = self.processor.process(text, &mut self.store);
        info!(
            applied = outcome.applied.len(),
            initialized = outcome.initialized.len(),
            warnings = outcome.warnings.len(),
            skipped = outcome.skipped.len(),
            "Applied generated text"
        );
        outcome
    }

    /// Deep copy of all scopes
    #[inline]
    #[must_use]
    pub fn export_current_state(&self) -> ScopedState {
        self.store.export_snapshot()
    }

    /// Compute the variable data for a new node from the current state
    ///
    /// # Errors
    /// Returns error if the state cannot be serialized
    pub fn create_variable_snapshot(
        &mut self,
        request: SnapshotRequest<'_>,
    ) -> Result<TreeNode, EngineError> {
        let node_id = request.node_id().clone();
        self.snapshots
            .create_variable_snapshot(&self.store, request)
            .map_err(|e| {
                error!(node = %node_id, error = %e, "Failed to create variable snapshot");
                e.into()
            })
    }

    /// Commit the current state as a new node of `tree`
    ///
    /// The parent's state is resolved from the tree, so the node stores a
    /// diff whenever the policy allows.
    ///
    /// # Errors
    /// Returns error if the parent path is broken or the id is taken
    pub fn commit_node(
        &mut self,
        tree: &mut VariableTree,
        node_id: impl Into<NodeId>,
        parent: Option<&NodeId>,
    ) -> Result<NodeId, EngineError> {
        let node_id = node_id.into();
        let node = match parent {
            None => self
                .create_variable_snapshot(SnapshotRequest::root(node_id.clone()).at_ordinal(0))?,
            Some(parent_id) => {
                let parent_path = tree.path_to(parent_id).map_err(|e| {
                    error!(node = %node_id, parent = %parent_id, error = %e, "Cannot resolve parent");
                    EngineError::from(e)
                })?;
                let parent_state = resolve_state(&parent_path).state;
                // Interval placement follows depth so sibling branches do not shift it.
                self.create_variable_snapshot(
                    SnapshotRequest::child(node_id.clone(), parent_id.clone(), &parent_state)
                        .at_ordinal(parent_path.len()),
                )?
            }
        };
        tree.insert(node).map_err(|e| {
            error!(node = %node_id, error = %e, "Cannot insert node");
            EngineError::from(e)
        })?;
        Ok(node_id)
    }

    /// Rebuild the state at `node_id` from a root-first path and load it
    ///
    /// # Errors
    /// Returns error if the path is empty or lacks `node_id`
    pub fn restore_variable_state<P: AsRef<TreeNode>>(
        &mut self,
        node_id: &NodeId,
        path: &[P],
    ) -> Result<RestoreSummary, EngineError> {
        self.snapshots
            .restore_variable_state(&mut self.store, node_id, path)
            .map_err(|e| {
                error!(node = %node_id, error = %e, "Failed to restore variable state");
                e.into()
            })
    }

    /// Switch the live store to `node_id` of `tree`
    ///
    /// # Errors
    /// Returns error if the node is unknown or its ancestry is broken
    pub fn switch_to(
        &mut self,
        tree: &VariableTree,
        node_id: &NodeId,
    ) -> Result<RestoreSummary, EngineError> {
        let path = tree.path_to(node_id).map_err(|e| {
            error!(node = %node_id, error = %e, "Cannot resolve node path");
            EngineError::from(e)
        })?;
        self.restore_variable_state(node_id, &path)
    }

    /// Check that every node in `path` can be resolved
    #[must_use]
    pub fn validate_variable_state<P: AsRef<TreeNode>>(&self, path: &[P]) -> ChainValidation {
        self.snapshots.validate_variable_state(path)
    }

    /// Rebuild the end of `path` from its last intact snapshot and load it
    ///
    /// # Errors
    /// Returns error if no intact snapshot exists; callers typically fall
    /// back to an empty state
    pub fn repair_variable_state_chain<P: AsRef<TreeNode>>(
        &mut self,
        path: &[P],
    ) -> Result<RepairSummary, EngineError> {
        self.snapshots
            .repair_variable_state_chain(&mut self.store, path)
            .map_err(|e| {
                error!(nodes = path.len(), error = %e, "Failed to repair variable chain");
                e.into()
            })
    }

    /// Storage use along `path`
    #[must_use]
    pub fn get_storage_statistics<P: AsRef<TreeNode>>(&self, path: &[P]) -> StorageStatistics {
        self.snapshots.get_storage_statistics(path)
    }

    /// Human-readable dump of every scope and the recent history
    #[must_use]
    pub fn state_report(&self) -> String {
        let state = self.store.state();
        let mut out = String::from("=== Variable State ===\n");
        for scope in Scope::ALL {
            let leaves = flatten(state.scope(scope));
            let _ = writeln!(out, "[{scope}] {} variables", leaves.len());
            for (path, value) in &leaves {
                let _ = writeln!(out, "  {path} = {value}");
            }
        }

        let recent = self.store.ledger().recent(10);
        let _ = writeln!(out, "=== Recent Changes ({}) ===", self.store.history().len());
        for record in &recent {
            let _ = writeln!(
                out,
                "  {} {} {}.{}: {} -> {}",
                record.timestamp.format("%H:%M:%S"),
                record.operation,
                record.scope,
                record.path,
                record.old_value,
                record.new_value
            );
        }
        out
    }

    /// All scopes plus export metadata, as JSON
    ///
    /// # Errors
    /// Returns error if the state cannot be serialized
    pub fn export_json(&self) -> Result<Value, EngineError> {
        let scopes = serde_json::to_value(self.store.state()).map_err(|e| {
            error!(error = %e, "Failed to export state");
            EngineError::from(e)
        })?;
        Ok(json!({
            "state": scopes,
            "metadata": {
                "exportedAt": Utc::now().to_rfc3339(),
                "version": crate::VERSION,
                "variableCount": self.store.state().leaf_count(),
                "historyLength": self.store.history().len(),
                "snapshotsCommitted": self.snapshots.committed(),
            }
        }))
    }

    /// Case-insensitive search over leaf paths and values
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<SearchHit> {
        let needle = keyword.to_lowercase();
        let state = self.store.state();
        Scope::ALL
            .into_iter()
            .flat_map(|scope| {
                flatten(state.scope(scope))
                    .into_iter()
                    .map(move |(path, value)| SearchHit { scope, path, value })
            })
            .filter(|hit| {
                hit.path.to_lowercase().contains(&needle)
                    || value_text(&hit.value).to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Most recent change records, newest first
    #[must_use]
    pub fn change_history(&self, limit: usize) -> Vec<ChangeRecord> {
        self.store.ledger().recent(limit)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
