//! The normalized mutation command and extraction results

use crate::error::CommandError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Range;
use vbe_store::VarPath;

/// One instruction to move a variable from an expected value to a new one
///
/// Every dialect normalizes into this shape. `old_value` is advisory:
/// `None` means the instruction carried no expectation at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationCommand {
    /// Normalized dotted path
    pub path: String,
    /// Value the instruction believes is current
    #[serde(default)]
    pub old_value: Option<Value>,
    /// Value to write
    pub new_value: Value,
    /// Free-form explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MutationCommand {
    /// Create a command, normalizing the path
    ///
    /// # Errors
    /// Returns error if the path does not parse
    pub fn new(
        path: &str,
        old_value: Option<Value>,
        new_value: Value,
        reason: Option<String>,
    ) -> Result<Self, CommandError> {
        let parsed: VarPath = path
            .parse()
            .map_err(|e| CommandError::invalid_path(path, e))?;
        Ok(Self {
            path: parsed.to_string(),
            old_value,
            new_value,
            reason: reason.filter(|r| !r.trim().is_empty()),
        })
    }
}

/// What the processor does with an extraction's span of text
#[derive(Debug, Clone, PartialEq)]
pub enum SpanAction {
    /// Strip the span from the visible text
    Remove,
    /// Leave the span untouched (malformed instructions)
    Keep,
    /// Replace the span with rendered initialization instructions
    ///
    /// Carries every path the text reads through a get-style placeholder.
    Initialize { referenced: Vec<String> },
}

/// One match produced by a dialect pass
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Byte range in the scanned text
    pub span: Range<usize>,
    /// Name of the producing dialect
    pub dialect: &'static str,
    /// Commands in text order
    pub commands: Vec<MutationCommand>,
    /// Instructions inside the span that could not be parsed
    pub errors: Vec<CommandError>,
    /// Span treatment
    pub action: SpanAction,
}

impl Extraction {
    /// Span holding well-formed commands, removed from the text
    #[must_use]
    pub fn commands(span: Range<usize>, dialect: &'static str, commands: Vec<MutationCommand>) -> Self {
        Self {
            span,
            dialect,
            commands,
            errors: Vec::new(),
            action: SpanAction::Remove,
        }
    }

    /// Span holding one malformed instruction, left in the text
    #[must_use]
    pub fn malformed(span: Range<usize>, dialect: &'static str, error: CommandError) -> Self {
        Self {
            span,
            dialect,
            commands: Vec::new(),
            errors: vec![error],
            action: SpanAction::Keep,
        }
    }

    /// True if the two spans share at least one byte
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.span.start < other.span.end && other.span.start < self.span.end
    }
}
