//! Path walking and numeric helpers over JSON values
//!
//! Shared by the store and by diff replay so both mutate state identically.

use crate::path::VarPath;
use serde_json::{Map, Number, Value};

/// Read the value at `path`, descending through objects and arrays
#[must_use]
pub fn lookup<'a>(root: &'a Map<String, Value>, path: &VarPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = root.get(first)?;
    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed
///
/// Scalars in the way are replaced by objects. Arrays are only descended
/// through by an in-range index, or extended by exactly one element.
/// Returns false if the write was blocked by an array.
pub fn assign(root: &mut Map<String, Value>, path: &VarPath, value: Value) -> bool {
    assign_segments(root, path.segments(), value)
}

fn assign_segments(map: &mut Map<String, Value>, segments: &[String], value: Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    if rest.is_empty() {
        map.insert(first.clone(), value);
        return true;
    }
    let entry = map
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    assign_value(entry, rest, value)
}

fn assign_value(node: &mut Value, segments: &[String], value: Value) -> bool {
    match node {
        Value::Object(map) => return assign_segments(map, segments, value),
        Value::Array(items) => {
            let Some(index) = segments.first().and_then(|s| s.parse::<usize>().ok()) else {
                return false;
            };
            let rest = &segments[1..];
            if index == items.len() {
                items.push(if rest.is_empty() {
                    Value::Null
                } else {
                    Value::Object(Map::new())
                });
            }
            let Some(slot) = items.get_mut(index) else {
                return false;
            };
            if rest.is_empty() {
                *slot = value;
                return true;
            }
            return assign_value(slot, rest, value);
        }
        _ => {}
    }

    *node = Value::Object(Map::new());
    match node {
        Value::Object(map) => assign_segments(map, segments, value),
        _ => false,
    }
}

/// Remove the value at `path`, returning it
pub fn remove(root: &mut Map<String, Value>, path: &VarPath) -> Option<Value> {
    let (leaf, parents) = path.segments().split_last()?;
    let Some((first, rest)) = parents.split_first() else {
        return root.remove(leaf);
    };

    let mut current = root.get_mut(first)?;
    for segment in rest {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Object(map) => map.remove(leaf),
        Value::Array(items) => {
            let index = leaf.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

/// Direction of a numeric adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    /// Add the delta
    Up,
    /// Subtract the delta
    Down,
}

/// Numeric view of a value; numeric strings count
#[must_use]
pub fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
        }
        _ => None,
    }
}

/// Apply `delta` to `current`, treating missing or non-numeric values as zero
///
/// Numeric strings on either side are read as numbers.
///
/// Stays in integer arithmetic when both sides are integers and the result
/// fits; otherwise falls back to `f64`.
#[must_use]
pub fn adjust(current: Option<&Value>, delta: &Value, direction: Adjust) -> Value {
    let base = current.and_then(as_number).unwrap_or_else(|| Number::from(0));
    let delta = as_number(delta).unwrap_or_else(|| Number::from(0));

    if let (Some(a), Some(b)) = (base.as_i64(), delta.as_i64()) {
        let result = match direction {
            Adjust::Up => a.checked_add(b),
            Adjust::Down => a.checked_sub(b),
        };
        if let Some(result) = result {
            return Value::from(result);
        }
    }

    let a = base.as_f64().unwrap_or(0.0);
    let b = delta.as_f64().unwrap_or(0.0);
    let result = match direction {
        Adjust::Up => a + b,
        Adjust::Down => a - b,
    };
    Number::from_f64(result).map_or(Value::Null, Value::Number)
}

/// Equality that tolerates `3` vs `3.0` vs `"3"` and missing vs `null`
#[must_use]
pub fn loosely_equal(expected: &Value, actual: Option<&Value>) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    if expected == actual {
        return true;
    }
    match (as_number(expected), as_number(actual)) {
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> VarPath {
        VarPath::parse(s).unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn lookup_through_arrays() {
        let root = obj(json!({"party": {"members": [{"name": "a"}, {"name": "b"}]}}));
        assert_eq!(lookup(&root, &path("party.members[1].name")), Some(&json!("b")));
        assert_eq!(lookup(&root, &path("party.members[5].name")), None);
        assert_eq!(lookup(&root, &path("party.leader")), None);
    }

    #[test]
    fn assign_creates_intermediates() {
        let mut root = Map::new();
        assert!(assign(&mut root, &path("world.clock.hour"), json!(9)));
        assert_eq!(Value::Object(root), json!({"world": {"clock": {"hour": 9}}}));
    }

    #[test]
    fn assign_replaces_scalar_intermediate() {
        let mut root = obj(json!({"world": 3}));
        assert!(assign(&mut root, &path("world.day"), json!(1)));
        assert_eq!(Value::Object(root), json!({"world": {"day": 1}}));
    }

    #[test]
    fn assign_into_array() {
        let mut root = obj(json!({"items": ["a", "b"]}));
        assert!(assign(&mut root, &path("items[1]"), json!("z")));
        assert!(assign(&mut root, &path("items[2]"), json!("c")));
        assert!(!assign(&mut root, &path("items[9]"), json!("x")));
        assert!(!assign(&mut root, &path("items.name"), json!("x")));
        assert_eq!(root["items"], json!(["a", "z", "c"]));
    }

    #[test]
    fn remove_leaf() {
        let mut root = obj(json!({"a": {"b": 1, "c": 2}, "list": [1, 2, 3]}));
        assert_eq!(remove(&mut root, &path("a.b")), Some(json!(1)));
        assert_eq!(remove(&mut root, &path("a.missing")), None);
        assert_eq!(remove(&mut root, &path("list[0]")), Some(json!(1)));
        assert_eq!(Value::Object(root), json!({"a": {"c": 2}, "list": [2, 3]}));
    }

    #[test]
    fn adjust_integer_and_float() {
        assert_eq!(adjust(Some(&json!(3)), &json!(2), Adjust::Up), json!(5));
        assert_eq!(adjust(Some(&json!(3)), &json!(5), Adjust::Down), json!(-2));
        assert_eq!(adjust(Some(&json!(1.5)), &json!(1), Adjust::Up), json!(2.5));
        assert_eq!(adjust(None, &json!(4), Adjust::Up), json!(4));
        assert_eq!(adjust(Some(&json!("text")), &json!(1), Adjust::Up), json!(1));
        assert_eq!(adjust(Some(&json!(1)), &json!("2"), Adjust::Up), json!(3));
    }

    #[test]
    fn adjust_reads_numeric_string_current() {
        assert_eq!(adjust(Some(&json!("5")), &json!(1), Adjust::Up), json!(6));
        assert_eq!(adjust(Some(&json!(" 10 ")), &json!("4"), Adjust::Down), json!(6));
        assert_eq!(adjust(Some(&json!("2.5")), &json!(1), Adjust::Up), json!(3.5));
    }

    #[test]
    fn adjust_overflow_falls_back_to_float() {
        let result = adjust(Some(&json!(i64::MAX)), &json!(1), Adjust::Up);
        assert!(result.is_f64());
    }

    #[test]
    fn loose_equality() {
        assert!(loosely_equal(&json!(3), Some(&json!(3.0))));
        assert!(loosely_equal(&json!("3"), Some(&json!(3))));
        assert!(loosely_equal(&Value::Null, None));
        assert!(!loosely_equal(&json!("calm"), None));
        assert!(!loosely_equal(&json!(3), Some(&json!(4))));
    }
}
