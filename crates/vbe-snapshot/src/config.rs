//! Snapshot policy configuration

use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};

/// Default number of changes above which a diff is stored as a full snapshot
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 100;

/// Default ordinal interval at which a full snapshot is forced
pub const DEFAULT_MAX_SNAPSHOT_INTERVAL: usize = 5;

/// When to store a full snapshot instead of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Diffs with more changes than this are stored as snapshots
    pub compression_threshold: usize,
    /// Nodes whose ordinal is a multiple of this get a snapshot
    pub max_snapshot_interval: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            max_snapshot_interval: DEFAULT_MAX_SNAPSHOT_INTERVAL,
        }
    }
}

impl SnapshotConfig {
    /// Set compression threshold
    #[must_use]
    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    /// Set snapshot interval
    #[must_use]
    pub fn with_max_snapshot_interval(mut self, interval: usize) -> Self {
        self.max_snapshot_interval = interval;
        self
    }

    /// Check the policy is usable
    ///
    /// # Errors
    /// Returns [`SnapshotError::InvalidConfig`] naming the first invalid field
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.max_snapshot_interval == 0 {
            return Err(SnapshotError::InvalidConfig {
                field: "max_snapshot_interval",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SnapshotConfig::default();
        assert_eq!(config.compression_threshold, 100);
        assert_eq!(config.max_snapshot_interval, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let config = SnapshotConfig::default().with_max_snapshot_interval(0);
        assert!(matches!(
            config.validate(),
            Err(SnapshotError::InvalidConfig {
                field: "max_snapshot_interval",
                ..
            })
        ));
    }
}
