//! The live variable store
//!
//! Holds one nested mapping per [`Scope`], a flat mirror of the global scope
//! for older callers, and the [`ChangeLedger`].
//!
//! # Failure semantics
//! Nothing here fails. An invalid path turns a write into a no-op and a read
//! into the caller's default, because paths usually come from model output.

use crate::ledger::{ChangeLedger, ChangeRecord, Operation};
use crate::path::VarPath;
use crate::scope::{Scope, ScopedState};
use crate::value::{self, Adjust};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Scoped key-path variable store
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    state: ScopedState,
    /// Flattened copy of the global scope, keyed by normalized dotted path
    legacy: BTreeMap<String, Value>,
    ledger: ChangeLedger,
}

impl VariableStore {
    /// Empty store with the default ledger policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with a custom ledger
    #[inline]
    #[must_use]
    pub fn with_ledger(ledger: ChangeLedger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    /// Value at `path`, if present
    #[must_use]
    pub fn get(&self, scope: Scope, path: &str) -> Option<&Value> {
        let path = VarPath::parse(path)?;
        value::lookup(self.state.scope(scope), &path)
    }

    /// Value at `path`, or `default` when missing or the path is invalid
    #[must_use]
    pub fn get_or(&self, scope: Scope, path: &str, default: Value) -> Value {
        self.get(scope, path).cloned().unwrap_or(default)
    }

    /// True if a value exists at `path`
    #[inline]
    #[must_use]
    pub fn has(&self, scope: Scope, path: &str) -> bool {
        self.get(scope, path).is_some()
    }

    /// Write `value` at `path`
    ///
    /// Returns false if the path is invalid or the write was blocked.
    pub fn set(&mut self, scope: Scope, path: &str, value: Value) -> bool {
        let Some(path) = parse_for_write(path) else {
            return false;
        };
        let old = value::lookup(self.state.scope(scope), &path).cloned();
        let operation = if old.is_some() {
            Operation::Set
        } else {
            Operation::Add
        };
        self.write(scope, &path, old, value, operation)
    }

    /// Add `delta` to the number at `path`
    ///
    /// Missing or non-numeric values count as zero. Returns the new value.
    pub fn increment(&mut self, scope: Scope, path: &str, delta: impl Into<Value>) -> Option<Value> {
        self.adjust(scope, path, &delta.into(), Adjust::Up)
    }

    /// Subtract `delta` from the number at `path`
    pub fn decrement(&mut self, scope: Scope, path: &str, delta: impl Into<Value>) -> Option<Value> {
        self.adjust(scope, path, &delta.into(), Adjust::Down)
    }

    fn adjust(&mut self, scope: Scope, path: &str, delta: &Value, direction: Adjust) -> Option<Value> {
        let path = parse_for_write(path)?;
        let old = value::lookup(self.state.scope(scope), &path).cloned();
        let new = value::adjust(old.as_ref(), delta, direction);
        let operation = match direction {
            Adjust::Up => Operation::Inc,
            Adjust::Down => Operation::Dec,
        };
        self.write(scope, &path, old, new.clone(), operation)
            .then_some(new)
    }

    /// Remove the value at `path`, returning it
    pub fn delete(&mut self, scope: Scope, path: &str) -> Option<Value> {
        let path = parse_for_write(path)?;
        let removed = value::remove(self.state.scope_mut(scope), &path)?;
        if scope == Scope::Global {
            self.mirror_global(&path);
        }
        self.ledger.push(ChangeRecord::now(
            scope,
            path.to_string(),
            removed.clone(),
            Value::Null,
            Operation::Delete,
        ));
        Some(removed)
    }

    fn write(
        &mut self,
        scope: Scope,
        path: &VarPath,
        old: Option<Value>,
        new: Value,
        operation: Operation,
    ) -> bool {
        if !value::assign(self.state.scope_mut(scope), path, new.clone()) {
            tracing::debug!(%scope, %path, "write blocked by array");
            return false;
        }
        if scope == Scope::Global {
            self.mirror_global(path);
        }
        self.ledger.push(ChangeRecord::now(
            scope,
            path.to_string(),
            old.unwrap_or(Value::Null),
            new,
            operation,
        ));
        true
    }

    /// Resync the legacy mirror for the top-level entry containing `path`
    fn mirror_global(&mut self, path: &VarPath) {
        let Some(top) = path.segments().first() else {
            return;
        };
        let below = format!("{top}.");
        self.legacy.retain(|k, _| k != top && !k.starts_with(&below));
        if let Some(current) = self.state.global.get(top) {
            flatten_into(top, current, &mut self.legacy);
        }
    }

    /// Read from the flat legacy mirror of the global scope
    #[must_use]
    pub fn legacy_get(&self, path: &str) -> Option<&Value> {
        let path = VarPath::parse(path)?;
        self.legacy.get(&path.to_string())
    }

    /// The whole legacy mirror
    #[inline]
    #[must_use]
    pub fn legacy(&self) -> &BTreeMap<String, Value> {
        &self.legacy
    }

    /// Borrow the current scoped state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &ScopedState {
        &self.state
    }

    /// Deep copy of all scopes
    #[inline]
    #[must_use]
    pub fn export_snapshot(&self) -> ScopedState {
        self.state.clone()
    }

    /// Replace every scope wholesale and clear the ledger
    pub fn load_snapshot(&mut self, state: ScopedState) {
        self.state = state;
        self.legacy.clear();
        for (key, value) in &self.state.global {
            flatten_into(key, value, &mut self.legacy);
        }
        self.ledger.clear();
    }

    /// Retained change records, oldest first
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[ChangeRecord] {
        self.ledger.records()
    }

    /// The change ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    /// Drop all change records
    #[inline]
    pub fn clear_history(&mut self) {
        self.ledger.clear();
    }
}

fn parse_for_write(raw: &str) -> Option<VarPath> {
    let parsed = VarPath::parse(raw);
    if parsed.is_none() {
        tracing::debug!(path = raw, "ignoring write to invalid path");
    }
    parsed
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(&format!("{prefix}.{k}"), v, out);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Flatten a scope mapping into `path -> leaf` pairs
#[must_use]
pub fn flatten(map: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        flatten_into(key, value, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn get_missing_returns_default() {
        let store = VariableStore::new();
        assert_eq!(store.get_or(Scope::Global, "a.b.c", json!(7)), json!(7));
        assert_eq!(store.get_or(Scope::Global, "", json!("d")), json!("d"));
        assert!(!store.has(Scope::Global, "a"));
    }

    #[test]
    fn set_records_add_then_set() {
        let mut store = VariableStore::new();
        assert!(store.set(Scope::Global, "affinity", json!(3)));
        assert!(store.set(Scope::Global, "affinity", json!(5)));

        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].operation, Operation::Add);
        assert_eq!(history[0].old_value, Value::Null);
        assert_eq!(history[1].operation, Operation::Set);
        assert_eq!(history[1].old_value, json!(3));
        assert_eq!(history[1].new_value, json!(5));
    }

    #[test]
    fn invalid_path_write_is_noop() {
        let mut store = VariableStore::new();
        assert!(!store.set(Scope::Global, "a..b", json!(1)));
        assert!(!store.set(Scope::Global, "", json!(1)));
        assert!(store.increment(Scope::Global, "x[", 1).is_none());
        assert!(store.delete(Scope::Global, "").is_none());
        assert!(store.history().is_empty());
        assert!(store.state().is_empty());
    }

    #[test]
    fn increment_and_decrement() {
        let mut store = VariableStore::new();
        assert_eq!(store.increment(Scope::Global, "stats.level", 1), Some(json!(1)));
        assert_eq!(store.increment(Scope::Global, "stats.level", 2), Some(json!(3)));
        assert_eq!(store.decrement(Scope::Global, "stats.level", 5), Some(json!(-2)));

        store.set(Scope::Global, "mood", json!("calm"));
        assert_eq!(store.increment(Scope::Global, "mood", 1), Some(json!(1)));

        let ops: Vec<_> = store.history().iter().map(|r| r.operation).collect();
        assert_eq!(
            ops,
            vec![Operation::Inc, Operation::Inc, Operation::Dec, Operation::Add, Operation::Inc]
        );
    }

    #[test]
    fn delete_records_removed_value() {
        let mut store = VariableStore::new();
        store.set(Scope::Local, "flag", json!(true));
        assert_eq!(store.delete(Scope::Local, "flag"), Some(json!(true)));
        assert_eq!(store.delete(Scope::Local, "flag"), None);

        let last = store.history().last().unwrap();
        assert_eq!(last.operation, Operation::Delete);
        assert_eq!(last.old_value, json!(true));
        assert_eq!(last.scope, Scope::Local);
    }

    #[test]
    fn scopes_are_independent() {
        let mut store = VariableStore::new();
        store.set(Scope::Global, "x", json!(1));
        store.set(Scope::Message, "x", json!(2));
        assert_eq!(store.get(Scope::Global, "x"), Some(&json!(1)));
        assert_eq!(store.get(Scope::Message, "x"), Some(&json!(2)));
        assert!(!store.has(Scope::Local, "x"));
    }

    #[test]
    fn global_writes_mirror_into_legacy() {
        let mut store = VariableStore::new();
        store.set(Scope::Global, "world.clock", json!({"day": 1, "hour": 9}));
        store.set(Scope::Local, "private", json!(1));
        assert_eq!(store.legacy_get("world.clock.day"), Some(&json!(1)));
        assert_eq!(store.legacy_get("private"), None);

        store.set(Scope::Global, "world.clock.day", json!(2));
        assert_eq!(store.legacy_get("world.clock.day"), Some(&json!(2)));

        store.set(Scope::Global, "world", json!("flat"));
        assert_eq!(store.legacy_get("world.clock.hour"), None);
        assert_eq!(store.legacy_get("world"), Some(&json!("flat")));

        store.delete(Scope::Global, "world");
        assert!(store.legacy().is_empty());
    }

    #[test]
    fn legacy_mirror_matches_flattened_global() {
        let mut store = VariableStore::new();
        store.set(Scope::Global, "a", json!(1));
        store.set(Scope::Global, "a.b", json!(2));
        store.set(Scope::Global, "c[0]", json!("x"));
        store.increment(Scope::Global, "d.e", 4);
        assert_eq!(store.legacy(), &flatten(&store.state().global));
    }

    #[test]
    fn load_snapshot_replaces_and_clears_ledger() {
        let mut store = VariableStore::new();
        store.set(Scope::Global, "old", json!(1));

        let mut state = ScopedState::from_global(json!({"new": {"value": 2}}));
        state.cache.insert("tmp".into(), json!(true));
        store.load_snapshot(state.clone());

        assert_eq!(store.export_snapshot(), state);
        assert!(store.history().is_empty());
        assert!(!store.has(Scope::Global, "old"));
        assert_eq!(store.legacy_get("new.value"), Some(&json!(2)));
    }
}
