//! Tagged block dialect
//!
//! Wraps a batch of call/inline instructions:
//!
//! ```text
//! <UpdateVariable>
//! _.set('affinity', 3, 5);//gift
//! @mood=calm⇒happy@
//! </UpdateVariable>
//! ```
//!
//! The whole block, prose included, disappears from the visible text.

use super::{CallDialect, CommandDialect, DialectRegistry, InlineDialect};
use crate::command::Extraction;
use crate::error::CommandError;
use regex::Regex;

/// Tag used when none is configured
pub const DEFAULT_BLOCK_TAG: &str = "UpdateVariable";

/// `<Tag>...</Tag>` instruction batches
#[derive(Debug)]
pub struct BlockDialect {
    block: Regex,
    opening: Regex,
    inner: DialectRegistry,
}

impl BlockDialect {
    const NAME: &'static str = "block";

    /// Block dialect for `<tag>...</tag>`, matched case-insensitively
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let escaped = regex::escape(tag.trim());
        let block = Regex::new(&format!(r"(?is)<\s*{escaped}\s*>(.*?)<\s*/\s*{escaped}\s*>"))
            .expect("escaped block regex must compile");
        let opening = Regex::new(&format!(r"(?i)<\s*{escaped}\s*>"))
            .expect("escaped opening regex must compile");

        let mut inner = DialectRegistry::new();
        inner.register(CallDialect);
        inner.register(InlineDialect);

        Self {
            block,
            opening,
            inner,
        }
    }
}

impl Default for BlockDialect {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_TAG)
    }
}

impl CommandDialect for BlockDialect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn scan(&self, text: &str) -> Vec<Extraction> {
        let mut found = Vec::new();
        let mut closed_until = 0;

        for caps in self.block.captures_iter(text) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            // Openers between complete blocks never found their closing tag
            found.extend(self.unterminated(text, closed_until, whole.start()));
            closed_until = whole.end();

            let mut extraction = Extraction::commands(whole.range(), Self::NAME, Vec::new());
            for inner in self.inner.scan_all(body.as_str()) {
                extraction.commands.extend(inner.commands);
                extraction.errors.extend(inner.errors);
            }
            found.push(extraction);
        }
        found.extend(self.unterminated(text, closed_until, text.len()));
        found
    }

    fn priority(&self) -> i32 {
        30
    }
}

impl BlockDialect {
    fn unterminated(&self, text: &str, from: usize, to: usize) -> Vec<Extraction> {
        self.opening
            .find_iter(&text[from..to])
            .map(|m| {
                Extraction::malformed(
                    from + m.start()..from + m.end(),
                    Self::NAME,
                    CommandError::Unterminated(Self::NAME),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SpanAction;
    use serde_json::json;

    #[test]
    fn block_collects_both_inner_forms() {
        let text = "Hi.\n<UpdateVariable>\n_.set('affinity', 3, 5);//gift\n@mood=calm⇒happy@\n</UpdateVariable>\nBye.";
        let found = BlockDialect::default().scan(text);
        assert_eq!(found.len(), 1);

        let block = &found[0];
        assert_eq!(block.action, SpanAction::Remove);
        assert!(text[block.span.clone()].starts_with("<UpdateVariable>"));
        assert!(text[block.span.clone()].ends_with("</UpdateVariable>"));

        let paths: Vec<_> = block.commands.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["affinity", "mood"]);
        assert_eq!(block.commands[0].reason.as_deref(), Some("gift"));
        assert_eq!(block.commands[1].new_value, json!("happy"));
    }

    #[test]
    fn tag_is_case_insensitive() {
        let found = BlockDialect::default().scan("<updatevariable>@a=1@</UPDATEVARIABLE>");
        assert_eq!(found[0].commands.len(), 1);
    }

    #[test]
    fn custom_tag() {
        let dialect = BlockDialect::new("vars");
        let found = dialect.scan("<vars>set('a', 0, 1)</vars><UpdateVariable>@b=1@</UpdateVariable>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].commands[0].path, "a");
    }

    #[test]
    fn inner_errors_are_collected() {
        let found = BlockDialect::default().scan("<UpdateVariable>set('a', 1)\n@b=2@</UpdateVariable>");
        assert_eq!(found[0].commands.len(), 1);
        assert_eq!(found[0].errors, vec![CommandError::ArgumentCount { found: 2 }]);
    }

    #[test]
    fn unclosed_block_reported_and_kept() {
        let text = "<UpdateVariable>\n@a=1@";
        let found = BlockDialect::default().scan(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].action, SpanAction::Keep);
        assert_eq!(&text[found[0].span.clone()], "<UpdateVariable>");
    }

    #[test]
    fn empty_block_is_valid() {
        let found = BlockDialect::default().scan("<UpdateVariable></UpdateVariable>");
        assert_eq!(found.len(), 1);
        assert!(found[0].commands.is_empty());
        assert!(found[0].errors.is_empty());
    }
}
