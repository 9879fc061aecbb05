//! Bounded change ledger
//!
//! Every store mutation appends a [`ChangeRecord`]. The ledger covers
//! "changes since the last restore" and is lossy by design: once it grows past
//! its capacity it drops everything but the most recent `retain` entries.

use crate::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Ledger grows to this many entries before truncation
pub const DEFAULT_LEDGER_CAPACITY: usize = 100;

/// Entries kept after truncation
pub const DEFAULT_LEDGER_RETAIN: usize = 50;

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Overwrite an existing value
    Set,
    /// Create a value that did not exist
    Add,
    /// Numeric increase
    Inc,
    /// Numeric decrease
    Dec,
    /// Remove a value
    Delete,
}

impl Operation {
    /// Lowercase operation name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Delete => "delete",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded mutation of the live store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// When the mutation happened
    pub timestamp: DateTime<Utc>,
    /// Scope written
    #[serde(default)]
    pub scope: Scope,
    /// Normalized dotted path
    pub path: String,
    /// Value before the mutation (`null` if absent)
    pub old_value: Value,
    /// Value after the mutation (`null` for deletes)
    pub new_value: Value,
    /// Mutation kind
    pub operation: Operation,
}

impl ChangeRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn now(
        scope: Scope,
        path: impl Into<String>,
        old_value: Value,
        new_value: Value,
        operation: Operation,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            scope,
            path: path.into(),
            old_value,
            new_value,
            operation,
        }
    }
}

/// Append-only record list with a lossy retention policy
#[derive(Debug, Clone)]
pub struct ChangeLedger {
    records: Vec<ChangeRecord>,
    capacity: usize,
    retain: usize,
}

impl ChangeLedger {
    /// Ledger with the default 100 / 50 policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_LEDGER_CAPACITY, DEFAULT_LEDGER_RETAIN)
    }

    /// Ledger with a custom policy; `retain` is clamped to `capacity`
    #[must_use]
    pub fn with_policy(capacity: usize, retain: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
            retain: retain.min(capacity),
        }
    }

    /// Append a record, truncating if the ledger grew past capacity
    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push(record);
        if self.records.len() > self.capacity {
            let drop = self.records.len() - self.retain;
            self.records.drain(..drop);
            tracing::debug!(dropped = drop, "change ledger truncated");
        }
    }

    /// All retained records, oldest first
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Most recent `limit` records, newest first
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<ChangeRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    /// Number of retained records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing is retained
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record
    #[inline]
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for ChangeLedger {
    fn default() -> Self {
        Self::new()
    }
}
