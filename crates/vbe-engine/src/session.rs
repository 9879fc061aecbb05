//! Per-session engine registry
//!
//! Hosts running several conversations in one process keep one
//! [`VariableEngine`] per session here instead of sharing a store.
//! Each engine sits behind its own mutex, so sessions never contend.

use crate::config::EngineConfig;
use crate::engine::VariableEngine;
use crate::error::EngineError;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to one session's engine
pub type SessionHandle = Arc<Mutex<VariableEngine>>;

/// Session id to engine map
#[derive(Debug)]
pub struct SessionRegistry {
    config: EngineConfig,
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    /// Registry whose engines all use `config`
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if let Err(e) = config.validate() {
            error!(error = %e, "Rejected session registry configuration");
            return Err(e.into());
        }
        Ok(Self {
            config,
            sessions: DashMap::new(),
        })
    }

    /// Start a session with an empty store
    ///
    /// # Errors
    /// Returns error if the engine cannot be built
    pub fn open(&self) -> Result<(SessionId, SessionHandle), EngineError> {
        let id = SessionId::new();
        let handle = Arc::new(Mutex::new(VariableEngine::new(self.config.clone())?));
        self.sessions.insert(id, Arc::clone(&handle));
        info!(session = %id, active = self.sessions.len(), "Opened session");
        Ok((id, handle))
    }

    /// Engine of an open session
    ///
    /// # Errors
    /// Returns error if the session is unknown
    pub fn get(&self, id: SessionId) -> Result<SessionHandle, EngineError> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                error!(session = %id, "Unknown session");
                EngineError::SessionNotFound(id)
            })
    }

    /// End a session, returning its engine if it was open
    pub fn close(&self, id: SessionId) -> Option<SessionHandle> {
        let removed = self.sessions.remove(&id).map(|(_, handle)| handle);
        if removed.is_some() {
            info!(session = %id, active = self.sessions.len(), "Closed session");
        }
        removed
    }

    /// Number of open sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no session is open
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            sessions: DashMap::new(),
        }
    }
}
