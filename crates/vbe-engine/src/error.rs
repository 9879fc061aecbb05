//! Error types for the engine facade

use crate::config::ConfigError;
use crate::session::SessionId;
use vbe_snapshot::SnapshotError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Snapshot, restore or repair failed
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No engine registered under this session
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
}
