//! Variable scopes and the scoped state container

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Independent namespace for variable paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Shared conversation state; mirrored into the legacy flat store
    #[default]
    Global,
    /// Character-local state
    Local,
    /// State attached to a single message
    Message,
    /// Scratch space
    Cache,
}

impl Scope {
    /// All scopes in canonical order
    pub const ALL: [Self; 4] = [Self::Global, Self::Local, Self::Message, Self::Cache];

    /// Lowercase scope name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Local => "local",
            Self::Message => "message",
            Self::Cache => "cache",
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "local" => Ok(Self::Local),
            "message" => Ok(Self::Message),
            "cache" => Ok(Self::Cache),
            _ => Err(UnknownScope(s.to_string())),
        }
    }
}

/// Scope name did not match any known scope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

/// Full variable state, one nested mapping per scope
///
/// Serializes as `{ "global": {...}, "local": {...}, "message": {...}, "cache": {...} }`.
/// Missing scopes deserialize as empty mappings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopedState {
    /// Global scope
    #[serde(default)]
    pub global: Map<String, Value>,
    /// Local scope
    #[serde(default)]
    pub local: Map<String, Value>,
    /// Message scope
    #[serde(default)]
    pub message: Map<String, Value>,
    /// Cache scope
    #[serde(default)]
    pub cache: Map<String, Value>,
}

impl ScopedState {
    /// Empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State with only the global scope populated
    ///
    /// Non-object values yield an empty global scope.
    #[must_use]
    pub fn from_global(global: Value) -> Self {
        let global = match global {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            global,
            ..Self::default()
        }
    }

    /// Root mapping of a scope
    #[inline]
    #[must_use]
    pub fn scope(&self, scope: Scope) -> &Map<String, Value> {
        match scope {
            Scope::Global => &self.global,
            Scope::Local => &self.local,
            Scope::Message => &self.message,
            Scope::Cache => &self.cache,
        }
    }

    /// Mutable root mapping of a scope
    #[inline]
    pub fn scope_mut(&mut self, scope: Scope) -> &mut Map<String, Value> {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Local => &mut self.local,
            Scope::Message => &mut self.message,
            Scope::Cache => &mut self.cache,
        }
    }

    /// True if every scope is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Scope::ALL.iter().all(|s| self.scope(*s).is_empty())
    }

    /// Number of leaf values across all scopes
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        Scope::ALL
            .iter()
            .map(|s| self.scope(*s).values().map(count_leaves).sum::<usize>())
            .sum()
    }
}

fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Object(map) if !map.is_empty() => map.values().map(count_leaves).sum(),
        _ => 1,
    }
}
