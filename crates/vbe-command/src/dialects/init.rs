//! Initialization marker dialect
//!
//! `|init-vars|` (or `[init-vars]`) asks for an initialization instruction
//! for every variable the text reads through a get-style placeholder
//! (`{{getvar::path}}`, `{{get::path}}`, `getvar('path')`). Which of those
//! still need initializing is decided by the processor, which knows what the
//! rest of the text sets and what the store already holds.

use super::CommandDialect;
use crate::command::{Extraction, SpanAction};
use once_cell::sync::Lazy;
use regex::Regex;
use vbe_store::VarPath;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\|\s*init[-_]vars\s*\||\[\s*init[-_]vars\s*\]").expect("marker regex must compile")
});

static PLACEHOLDERS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"\{\{\s*get(?:var)?\s*::\s*([^}]+?)\s*\}\}").expect("macro regex must compile"),
        Regex::new(r#"\bgetvar\(\s*['"]([^'"]+)['"]\s*\)"#).expect("getvar regex must compile"),
    ]
});

/// `|init-vars|` markers
#[derive(Debug, Clone, Copy, Default)]
pub struct InitDialect;

impl InitDialect {
    const NAME: &'static str = "init";
}

impl CommandDialect for InitDialect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn scan(&self, text: &str) -> Vec<Extraction> {
        let markers: Vec<_> = MARKER.find_iter(text).map(|m| m.range()).collect();
        if markers.is_empty() {
            return Vec::new();
        }
        let referenced = referenced_paths(text);
        markers
            .into_iter()
            .map(|span| Extraction {
                span,
                dialect: Self::NAME,
                commands: Vec::new(),
                errors: Vec::new(),
                action: SpanAction::Initialize {
                    referenced: referenced.clone(),
                },
            })
            .collect()
    }

    fn priority(&self) -> i32 {
        20
    }
}

/// Normalized paths read through placeholders, deduplicated, in order of first use
#[must_use]
pub fn referenced_paths(text: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = PLACEHOLDERS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let m = caps.get(1)?;
            let path = VarPath::parse(m.as_str())?;
            Some((m.start(), path.to_string()))
        })
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut seen = std::collections::HashSet::new();
    hits.into_iter()
        .filter_map(|(_, path)| seen.insert(path.clone()).then_some(path))
        .collect()
}
