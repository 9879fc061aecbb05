//! Instruction dialects
//!
//! Each dialect is an independent pass over the text that produces
//! [`Extraction`]s in the shared [`MutationCommand`](crate::MutationCommand)
//! shape:
//! - [`CallDialect`]: `set(path, old, new[, reason])`
//! - [`InlineDialect`]: `@path=old⇒new@` or `@path=new@`
//! - [`BlockDialect`]: a tagged block wrapping call/inline instructions
//! - [`InitDialect`]: the `|init-vars|` marker
//!
//! New dialects plug in through [`CommandDialect`] without touching the store
//! or the snapshot logic.

use crate::command::Extraction;

mod block;
mod call;
mod init;
mod inline;

pub use block::{BlockDialect, DEFAULT_BLOCK_TAG};
pub use call::CallDialect;
pub use init::{referenced_paths, InitDialect};
pub use inline::InlineDialect;

/// One extraction pass over generated text
pub trait CommandDialect: Send + Sync + 'static {
    /// Stable dialect name
    fn name(&self) -> &'static str;

    /// Find every instruction in `text`, in text order
    fn scan(&self, text: &str) -> Vec<Extraction>;

    /// Higher priority claims overlapping spans first
    fn priority(&self) -> i32 {
        0
    }
}

/// Priority-ordered set of dialects
pub struct DialectRegistry {
    dialects: Vec<Box<dyn CommandDialect>>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("dialects", &self.names())
            .finish()
    }
}

impl DialectRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            dialects: Vec::new(),
        }
    }

    /// Register a dialect
    pub fn register<D: CommandDialect>(&mut self, dialect: D) {
        self.dialects.push(Box::new(dialect));
        // Sort by priority (higher first)
        self.dialects
            .sort_by_key(|d| std::cmp::Reverse(d.priority()));
    }

    /// Names in priority order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.dialects.iter().map(|d| d.name()).collect()
    }

    /// Run every pass and keep non-overlapping extractions, in text order
    ///
    /// Passes run highest priority first; a match overlapping a span some
    /// earlier pass already claimed is discarded.
    #[must_use]
    pub fn scan_all(&self, text: &str) -> Vec<Extraction> {
        let mut claimed: Vec<Extraction> = Vec::new();
        for dialect in &self.dialects {
            for extraction in dialect.scan(text) {
                if claimed.iter().any(|c| c.overlaps(&extraction)) {
                    tracing::trace!(
                        dialect = dialect.name(),
                        start = extraction.span.start,
                        "dropping overlapped match"
                    );
                    continue;
                }
                claimed.push(extraction);
            }
        }
        claimed.sort_by_key(|e| e.span.start);
        claimed
    }
}

/// Registry with the four built-in dialects
#[must_use]
pub fn default_dialects(block_tag: &str) -> DialectRegistry {
    let mut registry = DialectRegistry::new();
    registry.register(BlockDialect::new(block_tag));
    registry.register(InitDialect);
    registry.register(CallDialect);
    registry.register(InlineDialect);
    registry
}

/// Byte offset just past the end of the line containing `pos`
fn line_end(text: &str, pos: usize) -> usize {
    text[pos..].find('\n').map_or(text.len(), |i| pos + i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SpanAction;

    #[test]
    fn default_registry_order() {
        let registry = default_dialects(DEFAULT_BLOCK_TAG);
        assert_eq!(registry.names(), vec!["block", "init", "call", "inline"]);
    }

    #[test]
    fn block_claims_inner_instructions() {
        let registry = default_dialects(DEFAULT_BLOCK_TAG);
        let text = "before <UpdateVariable>set('a', 1, 2)\n@b=3@</UpdateVariable> after set('c', 0, 1)";
        let found = registry.scan_all(text);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].dialect, "block");
        assert_eq!(found[0].commands.len(), 2);
        assert_eq!(found[1].dialect, "call");
        assert_eq!(found[1].commands[0].path, "c");
    }

    #[test]
    fn results_in_text_order() {
        let registry = default_dialects(DEFAULT_BLOCK_TAG);
        let text = "@a=1@ then set('b', 0, 1) then @c=2@";
        let paths: Vec<_> = registry
            .scan_all(text)
            .into_iter()
            .flat_map(|e| e.commands)
            .map(|c| c.path)
            .collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }

    #[test]
    fn init_marker_recognized() {
        let registry = default_dialects(DEFAULT_BLOCK_TAG);
        let found = registry.scan_all("{{getvar::hp}} |init-vars|");
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0].action, SpanAction::Initialize { .. }));
    }

    #[test]
    fn registry_debug() {
        let registry = default_dialects(DEFAULT_BLOCK_TAG);
        assert!(format!("{registry:?}").contains("DialectRegistry"));
    }
}
