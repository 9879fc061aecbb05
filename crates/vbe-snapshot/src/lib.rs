//! VBE Snapshot/Diff Manager
//!
//! Persists variable state per dialogue-tree node and reconstructs it for
//! any branch.
//!
//! # Core Concepts
//!
//! - [`TreeNode`]: A node's persisted variable data (snapshot or diff)
//! - [`VariableChange`]: One entry of a diff
//! - [`SnapshotManager`]: Snapshot policy, restore, validation and repair
//! - [`VariableTree`]: Id index that produces root-first paths
//!
//! # Example
//!
//! ```rust
//! use vbe_snapshot::{SnapshotManager, SnapshotRequest};
//! use vbe_store::{Scope, VariableStore};
//! use serde_json::json;
//!
//! let mut manager = SnapshotManager::default();
//! let mut store = VariableStore::new();
//! store.set(Scope::Global, "hp", json!(10));
//! let root = manager.create_variable_snapshot(&store, SnapshotRequest::root("n0")).unwrap();
//!
//! let parent = store.export_snapshot();
//! store.increment(Scope::Global, "hp", 5);
//! let child = manager
//!     .create_variable_snapshot(&store, SnapshotRequest::child("n1", "n0", &parent))
//!     .unwrap();
//! assert!(child.variable_metadata.parent_snapshot);
//!
//! let mut fresh = VariableStore::new();
//! manager.restore_variable_state(&mut fresh, &"n1".into(), &[root, child]).unwrap();
//! assert_eq!(fresh.get(Scope::Global, "hp"), Some(&json!(15)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod checksum;
mod config;
mod diff;
mod error;
mod manager;
mod node;
mod report;

// Re-exports
pub use checksum::StateChecksum;
pub use config::{SnapshotConfig, DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_MAX_SNAPSHOT_INTERVAL};
pub use diff::{apply_changes, compute_state_diff, ArrayDelta, StateDiff, VariableChange};
pub use error::SnapshotError;
pub use manager::{resolve_state, ResolvedState, SnapshotManager, SnapshotReason, SnapshotRequest};
pub use node::{NodeId, NodeKind, TreeNode, VariableMetadata, VariableTree};
pub use report::{ChainValidation, RepairSummary, RestoreSummary, StorageStatistics};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
