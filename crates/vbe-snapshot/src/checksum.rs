//! Snapshot checksums
//!
//! [`StateChecksum`] is a Blake3 digest of a state's JSON encoding. Map keys
//! serialize in sorted order, so equal states always hash equal.

use crate::error::SnapshotError;
use std::fmt::{self, Display, Formatter};
use vbe_store::ScopedState;

/// 32-byte Blake3 digest of a scoped state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateChecksum([u8; 32]);

impl StateChecksum {
    /// Hash raw bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash a state's JSON encoding
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn of_state(state: &ScopedState) -> Result<Self, SnapshotError> {
        let json = serde_json::to_vec(state)?;
        Ok(Self::compute(&json))
    }

    /// Short form (first 16 hex chars) for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Compare against a stored hex digest
    #[must_use]
    pub fn matches(&self, stored: &str) -> bool {
        hex::decode(stored).is_ok_and(|bytes| bytes == self.0)
    }
}

impl Display for StateChecksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
