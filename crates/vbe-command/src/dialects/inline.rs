//! Inline delimited dialect
//!
//! `@path=oldValue⇒newValue@` carries an expectation; `@path=newValue@`
//! does not. ASCII `=>` is accepted in place of `⇒`.

use super::CommandDialect;
use crate::command::{Extraction, MutationCommand};
use crate::literal::coerce;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([^\s@=]+)=([^@\n]*?)@").expect("inline regex must compile"));

const ARROWS: [&str; 2] = ["⇒", "=>"];

/// `@path=...@` instructions
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDialect;

impl InlineDialect {
    const NAME: &'static str = "inline";
}

impl CommandDialect for InlineDialect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn scan(&self, text: &str) -> Vec<Extraction> {
        INLINE
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let path = caps.get(1)?.as_str();
                let body = caps.get(2)?.as_str();
                let span = whole.range();

                let (old_value, new_value) = match split_arrow(body) {
                    Some((old, new)) => (Some(coerce(old)), coerce(new)),
                    None => (None, coerce(body)),
                };
                Some(match MutationCommand::new(path, old_value, new_value, None) {
                    Ok(command) => Extraction::commands(span, Self::NAME, vec![command]),
                    Err(error) => Extraction::malformed(span, Self::NAME, error),
                })
            })
            .collect()
    }
}

fn split_arrow(body: &str) -> Option<(&str, &str)> {
    ARROWS
        .iter()
        .filter_map(|arrow| body.find(arrow).map(|pos| (pos, arrow.len())))
        .min_by_key(|(pos, _)| *pos)
        .map(|(pos, len)| (&body[..pos], &body[pos + len..]))
}
