//! Engine configuration
//!
//! [`EngineConfig`] bundles the snapshot policy, parser settings and ledger
//! retention. It loads from TOML; every section and field is optional.
//!
//! ```toml
//! [snapshot]
//! compression_threshold = 100
//! max_snapshot_interval = 5
//!
//! [parser]
//! block_tag = "UpdateVariable"
//! apply_init_commands = true
//!
//! [ledger]
//! capacity = 100
//! retain = 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vbe_command::ParserConfig;
use vbe_snapshot::{SnapshotConfig, SnapshotError};
use vbe_store::{ChangeLedger, DEFAULT_LEDGER_CAPACITY, DEFAULT_LEDGER_RETAIN};

/// Change ledger retention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Records kept before truncation kicks in
    pub capacity: usize,
    /// Most recent records kept after truncation
    pub retain: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LEDGER_CAPACITY,
            retain: DEFAULT_LEDGER_RETAIN,
        }
    }
}

impl LedgerConfig {
    /// Empty ledger with this policy
    #[inline]
    #[must_use]
    pub fn build(&self) -> ChangeLedger {
        ChangeLedger::with_policy(self.capacity, self.retain)
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// When to store full snapshots
    pub snapshot: SnapshotConfig,
    /// Command parsing
    pub parser: ParserConfig,
    /// Change history retention
    pub ledger: LedgerConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With snapshot policy
    #[inline]
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: SnapshotConfig) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// With parser settings
    #[inline]
    #[must_use]
    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    /// With ledger retention
    #[inline]
    #[must_use]
    pub fn with_ledger(mut self, capacity: usize, retain: usize) -> Self {
        self.ledger = LedgerConfig { capacity, retain };
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or invalid values
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or [`from_toml_str`](Self::from_toml_str) fails
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns the first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.snapshot.validate()?;
        if self.ledger.capacity == 0 {
            return Err(ConfigError::Invalid("ledger.capacity must be at least 1".into()));
        }
        if self.ledger.retain > self.ledger.capacity {
            return Err(ConfigError::Invalid(format!(
                "ledger.retain ({}) exceeds ledger.capacity ({})",
                self.ledger.retain, self.ledger.capacity
            )));
        }
        if self.parser.block_tag.trim().is_empty() {
            return Err(ConfigError::Invalid("parser.block_tag must not be empty".into()));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are out of range
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Snapshot policy rejected its values
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_sections() {
        let config = EngineConfig::from_toml_str(
            "[snapshot]\nmax_snapshot_interval = 10\n\n[parser]\nblock_tag = \"VarUpdate\"\n",
        )
        .unwrap();
        assert_eq!(config.snapshot.max_snapshot_interval, 10);
        assert_eq!(config.snapshot.compression_threshold, 100);
        assert_eq!(config.parser.block_tag, "VarUpdate");
        assert!(config.parser.apply_init_commands);
        assert_eq!(config.ledger, LedgerConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("[snapshot]\nmax_snapshot_interval = 0"),
            Err(ConfigError::Snapshot(SnapshotError::InvalidConfig { .. }))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[ledger]\ncapacity = 10\nretain = 20"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[snapshot\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ledger]\ncapacity = 20\nretain = 5").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ledger, LedgerConfig { capacity: 20, retain: 5 });
        assert_eq!(config.ledger.build().len(), 0);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = EngineConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
