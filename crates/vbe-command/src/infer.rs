//! Default values for variables that are read but never initialized
//!
//! A heuristic keyed on the variable's own name. The rules live in one
//! table ([`RULES`]) and are tried in order; the first match wins. Nothing
//! here can fail: an unmatched name defaults to an empty string.

use serde_json::Value;
use vbe_store::VarPath;

/// Default time bucket
pub const DEFAULT_TIME: &str = "morning";

/// Default location placeholder
pub const DEFAULT_LOCATION: &str = "unknown";

/// Default status string
pub const DEFAULT_STATUS: &str = "normal";

/// How a rule recognizes a name
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// The first word of the name is one of these
    FirstWord(&'static [&'static str]),
    /// Some word of the name is exactly one of these
    Word(&'static [&'static str]),
    /// The lowercased name contains one of these
    Contains(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, name: &str, words: &[String]) -> bool {
        match self {
            Self::FirstWord(list) => words.first().is_some_and(|w| list.contains(&w.as_str())),
            Self::Word(list) => words.iter().any(|w| list.contains(&w.as_str())),
            Self::Contains(list) => list.iter().any(|needle| name.contains(needle)),
        }
    }
}

/// Value a rule produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// Integer zero
    Zero,
    /// Fixed string
    Text(&'static str),
}

impl DefaultValue {
    /// Materialize as a JSON value
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Zero => Value::from(0),
            Self::Text(s) => Value::from(s),
        }
    }
}

/// One row of the inference table
#[derive(Debug, Clone, Copy)]
pub struct InferenceRule {
    /// Domain label, for diagnostics
    pub domain: &'static str,
    /// Name test
    pub matcher: Matcher,
    /// Produced default
    pub default: DefaultValue,
}

/// Inference table, tried top to bottom
pub static RULES: &[InferenceRule] = &[
    InferenceRule {
        domain: "boolean",
        matcher: Matcher::FirstWord(&["is", "has", "can", "should", "was", "did", "need"]),
        default: DefaultValue::Zero,
    },
    InferenceRule {
        domain: "boolean",
        matcher: Matcher::Contains(&["flag", "enabled", "unlocked", "triggered", "是否"]),
        default: DefaultValue::Zero,
    },
    InferenceRule {
        domain: "numeric",
        matcher: Matcher::Word(&["hp", "mp", "xp", "lv", "exp", "num", "cnt", "sp"]),
        default: DefaultValue::Zero,
    },
    InferenceRule {
        domain: "numeric",
        matcher: Matcher::Contains(&[
            "count", "level", "experience", "affinity", "favor", "intimacy", "trust", "score",
            "point", "money", "gold", "coin", "amount", "stage", "好感", "等级", "经验", "数量",
            "金钱",
        ]),
        default: DefaultValue::Zero,
    },
    InferenceRule {
        domain: "time",
        matcher: Matcher::Contains(&[
            "time", "date", "hour", "period", "clock", "season", "时间", "时段", "日期",
        ]),
        default: DefaultValue::Text(DEFAULT_TIME),
    },
    InferenceRule {
        domain: "time",
        matcher: Matcher::Word(&["day", "weekday"]),
        default: DefaultValue::Text(DEFAULT_TIME),
    },
    InferenceRule {
        domain: "location",
        matcher: Matcher::Contains(&[
            "location", "place", "position", "scene", "room", "area", "地点", "位置", "场景",
        ]),
        default: DefaultValue::Text(DEFAULT_LOCATION),
    },
    InferenceRule {
        domain: "state",
        matcher: Matcher::Contains(&["state", "status", "mood", "condition", "emotion", "状态", "心情"]),
        default: DefaultValue::Text(DEFAULT_STATUS),
    },
];

/// First rule matching the path's final segment
#[must_use]
pub fn matching_rule(path: &str) -> Option<&'static InferenceRule> {
    let leaf = VarPath::parse(path).map_or_else(|| path.trim().to_string(), |p| p.leaf().to_string());
    let words = split_words(&leaf);
    let name = leaf.to_lowercase();
    RULES.iter().find(|rule| rule.matcher.matches(&name, &words))
}

/// Plausible default for a variable named by `path`
#[must_use]
pub fn infer_default(path: &str) -> Value {
    matching_rule(path).map_or_else(|| Value::from(""), |rule| rule.default.to_value())
}

/// Split `isMet`, `is_met`, `is-met` into lowercase words
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
