//! Structural diffs between scoped states
//!
//! A diff is an ordered list of [`VariableChange`]s that, replayed onto the
//! parent state with [`apply_changes`], yields the child state exactly.
//!
//! - Objects are walked key by key; every differing leaf becomes one change.
//! - Arrays are leaves: a differing array is replaced whole, with an
//!   informational [`ArrayDelta`] attached.
//! - Numeric leaves become `inc`/`dec` only when replaying the delta gives
//!   back the exact number; otherwise they are plain `set`s.
//! - Object keys that cannot be written as a single path segment (they hold
//!   `.`, brackets or surrounding whitespace) collapse the change to the
//!   enclosing object. At the scope root that is impossible, and the diff is
//!   marked unrepresentable so the caller stores a full snapshot instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};
use vbe_store::value::{self, Adjust};
use vbe_store::{Operation, Scope, ScopedState, VarPath};

/// One recorded difference between a parent and child state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableChange {
    /// Scope the change belongs to
    #[serde(default)]
    pub scope: Scope,
    /// Normalized dotted path
    pub path: String,
    /// Parent value (`null` when absent)
    pub old_value: Value,
    /// For `set`/`add` the new value; for `inc`/`dec` the delta; `null` for `delete`
    pub new_value: Value,
    /// Kind of change
    pub operation: Operation,
    /// When the diff was computed
    pub timestamp: DateTime<Utc>,
    /// Element-level summary for replaced arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_delta: Option<ArrayDelta>,
}

/// Elements that appeared in or vanished from a replaced array
///
/// Informational only; replay always uses the whole new array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayDelta {
    /// Elements of the new array missing from the old one
    pub added: Vec<Value>,
    /// Elements of the old array missing from the new one
    pub removed: Vec<Value>,
}

impl ArrayDelta {
    /// Compare two arrays element-wise by membership
    #[must_use]
    pub fn between(old: &[Value], new: &[Value]) -> Self {
        Self {
            added: new.iter().filter(|v| !old.contains(v)).cloned().collect(),
            removed: old.iter().filter(|v| !new.contains(v)).cloned().collect(),
        }
    }
}

/// Result of [`compute_state_diff`]
#[derive(Debug, Clone, PartialEq)]
pub struct StateDiff {
    /// Ordered changes
    pub changes: Vec<VariableChange>,
    /// `false` when some difference cannot be expressed as path changes
    pub representable: bool,
}

impl StateDiff {
    /// No differences at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.representable
    }
}

/// Diff every scope of `parent` against `current`
///
/// All changes carry `timestamp`. Scopes are visited in
/// [`Scope::ALL`] order and keys in map order, so the output is
/// deterministic.
#[must_use]
pub fn compute_state_diff(
    parent: &ScopedState,
    current: &ScopedState,
    timestamp: DateTime<Utc>,
) -> StateDiff {
    let mut walker = DiffWalker {
        timestamp,
        changes: Vec::new(),
        representable: true,
    };
    for scope in Scope::ALL {
        walker.walk_root(scope, parent.scope(scope), current.scope(scope));
    }
    StateDiff {
        changes: walker.changes,
        representable: walker.representable,
    }
}

struct DiffWalker {
    timestamp: DateTime<Utc>,
    changes: Vec<VariableChange>,
    representable: bool,
}

impl DiffWalker {
    fn walk_root(&mut self, scope: Scope, old: &Map<String, Value>, new: &Map<String, Value>) {
        if old == new {
            return;
        }
        if has_unsafe_key(old, new) {
            self.representable = false;
            return;
        }
        self.walk_object(scope, &[], old, new);
    }

    fn walk_object(
        &mut self,
        scope: Scope,
        prefix: &[String],
        old: &Map<String, Value>,
        new: &Map<String, Value>,
    ) {
        for (key, new_value) in new {
            let path = child_path(prefix, key);
            match old.get(key) {
                None => self.push(
                    scope,
                    &path,
                    Value::Null,
                    new_value.clone(),
                    Operation::Add,
                ),
                Some(old_value) if old_value != new_value => {
                    self.walk_value(scope, &path, old_value, new_value);
                }
                Some(_) => {}
            }
        }
        for (key, old_value) in old {
            if !new.contains_key(key) {
                let path = child_path(prefix, key);
                self.push(scope, &path, old_value.clone(), Value::Null, Operation::Delete);
            }
        }
    }

    fn walk_value(&mut self, scope: Scope, path: &[String], old: &Value, new: &Value) {
        match (old, new) {
            (Value::Object(o), Value::Object(n)) => {
                if has_unsafe_key(o, n) {
                    self.push(scope, path, old.clone(), new.clone(), Operation::Set);
                } else {
                    self.walk_object(scope, path, o, n);
                }
            }
            (Value::Array(o), Value::Array(n)) => {
                let delta = ArrayDelta::between(o, n);
                self.push(scope, path, old.clone(), new.clone(), Operation::Set);
                if let Some(last) = self.changes.last_mut() {
                    last.array_delta = Some(delta);
                }
            }
            (Value::Number(o), Value::Number(n)) => match numeric_step(o, n) {
                Some((operation, delta)) => {
                    self.push(scope, path, old.clone(), delta, operation);
                }
                None => self.push(scope, path, old.clone(), new.clone(), Operation::Set),
            },
            _ => self.push(scope, path, old.clone(), new.clone(), Operation::Set),
        }
    }

    fn push(
        &mut self,
        scope: Scope,
        path: &[String],
        old_value: Value,
        new_value: Value,
        operation: Operation,
    ) {
        self.changes.push(VariableChange {
            scope,
            path: path.join("."),
            old_value,
            new_value,
            operation,
            timestamp: self.timestamp,
            array_delta: None,
        });
    }
}

fn child_path(prefix: &[String], key: &str) -> Vec<String> {
    let mut path = prefix.to_vec();
    path.push(key.to_string());
    path
}

/// Key survives a render/parse round trip as exactly one segment
fn is_safe_key(key: &str) -> bool {
    VarPath::parse(key).is_some_and(|p| p.len() == 1 && p.leaf() == key)
}

fn has_unsafe_key(old: &Map<String, Value>, new: &Map<String, Value>) -> bool {
    old.keys().chain(new.keys()).any(|k| !is_safe_key(k))
}

/// `inc`/`dec` with the delta that replays exactly, if there is one
fn numeric_step(old: &Number, new: &Number) -> Option<(Operation, Value)> {
    let (direction, delta) = match (old.as_i64(), new.as_i64()) {
        (Some(a), Some(b)) => {
            let d = b.checked_sub(a)?;
            let direction = if d >= 0 { Adjust::Up } else { Adjust::Down };
            (direction, Number::from(d.checked_abs()?))
        }
        _ => {
            let d = new.as_f64()? - old.as_f64()?;
            let direction = if d >= 0.0 { Adjust::Up } else { Adjust::Down };
            (direction, Number::from_f64(d.abs())?)
        }
    };
    if delta.as_f64() == Some(0.0) {
        return None;
    }

    let delta = Value::Number(delta);
    let old = Value::Number(old.clone());
    if value::adjust(Some(&old), &delta, direction) != Value::Number(new.clone()) {
        return None;
    }
    let operation = match direction {
        Adjust::Up => Operation::Inc,
        Adjust::Down => Operation::Dec,
    };
    Some((operation, delta))
}

/// Replay `changes` onto `state` in order
///
/// Changes whose path does not parse, or whose write is blocked by a
/// non-container ancestor, are logged and skipped. Deletes of absent paths
/// change nothing and are not counted. Returns how many applied.
pub fn apply_changes(state: &mut ScopedState, changes: &[VariableChange]) -> usize {
    let mut applied = 0;
    for change in changes {
        let Some(path) = VarPath::parse(&change.path) else {
            warn!(path = %change.path, "Skipping change with invalid path");
            continue;
        };
        let root = state.scope_mut(change.scope);
        let ok = match change.operation {
            Operation::Set | Operation::Add => {
                value::assign(root, &path, change.new_value.clone())
            }
            Operation::Delete => {
                if value::remove(root, &path).is_none() {
                    debug!(path = %change.path, "Delete of absent path during replay");
                    continue;
                }
                true
            }
            Operation::Inc | Operation::Dec => {
                let direction = if change.operation == Operation::Inc {
                    Adjust::Up
                } else {
                    Adjust::Down
                };
                let next = value::adjust(value::lookup(root, &path), &change.new_value, direction);
                value::assign(root, &path, next)
            }
        };
        if ok {
            applied += 1;
        } else {
            warn!(path = %change.path, op = %change.operation, "Change blocked during replay");
        }
    }
    applied
}
