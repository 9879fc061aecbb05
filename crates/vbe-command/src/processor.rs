//! Process-and-hide: extract, apply, and strip mutation instructions
//!
//! # Pipeline
//!
//! ```text
//! text → DialectRegistry::scan_all → commands (text order) → VariableStore
//!                                  → init markers → inferred defaults
//!      → cleaned text (instruction spans removed, markers replaced)
//! ```

use crate::command::{Extraction, MutationCommand, SpanAction};
use crate::dialects::{default_dialects, DialectRegistry, DEFAULT_BLOCK_TAG};
use crate::error::CommandError;
use crate::infer::infer_default;
use crate::literal::render;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use vbe_store::{value, Scope, VariableStore};

static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("blank-run regex must compile"));

/// Reason attached to generated initialization commands
pub const INIT_REASON: &str = "init";

/// Parser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Tag name of the block dialect
    pub block_tag: String,
    /// Write generated initialization commands into the store
    pub apply_init_commands: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            block_tag: DEFAULT_BLOCK_TAG.to_string(),
            apply_init_commands: true,
        }
    }
}

/// An instruction whose claimed old value disagreed with the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyWarning {
    /// Variable path
    pub path: String,
    /// What the instruction expected
    pub expected: Value,
    /// What the store held (`None` if absent)
    pub actual: Option<Value>,
}

/// An instruction that was recognized but could not be applied
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstruction {
    /// Producing dialect
    pub dialect: &'static str,
    /// The instruction's text
    pub excerpt: String,
    /// Why it was skipped
    pub error: CommandError,
}

/// Result of processing one piece of generated text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutcome {
    /// Text with instruction syntax removed
    pub text: String,
    /// Commands applied, in text order
    pub applied: Vec<MutationCommand>,
    /// Initialization commands generated for `|init-vars|`
    pub initialized: Vec<MutationCommand>,
    /// Old-value mismatches (non-fatal)
    pub warnings: Vec<ConsistencyWarning>,
    /// Malformed or blocked instructions
    pub skipped: Vec<SkippedInstruction>,
}

impl ProcessOutcome {
    /// True if any command changed the store
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty() || !self.initialized.is_empty()
    }
}

/// Applies generated text to a store
#[derive(Debug)]
pub struct CommandProcessor {
    registry: DialectRegistry,
    config: ParserConfig,
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl CommandProcessor {
    /// Processor with the built-in dialects
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self {
            registry: default_dialects(&config.block_tag),
            config,
        }
    }

    /// Processor with a caller-assembled registry
    #[must_use]
    pub fn with_registry(registry: DialectRegistry, config: ParserConfig) -> Self {
        Self { registry, config }
    }

    /// Active settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Commands the text would apply, without touching any store
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<MutationCommand> {
        self.registry
            .scan_all(text)
            .into_iter()
            .flat_map(|e| e.commands)
            .collect()
    }

    /// Apply every instruction in `text` to the global scope of `store`
    ///
    /// Never fails: malformed instructions are skipped and reported, and
    /// old-value mismatches are applied anyway with a warning.
    pub fn process(&self, text: &str, store: &mut VariableStore) -> ProcessOutcome {
        let extractions = self.registry.scan_all(text);
        let mut outcome = ProcessOutcome::default();

        let set_paths: HashSet<&str> = extractions
            .iter()
            .flat_map(|e| e.commands.iter().map(|c| c.path.as_str()))
            .collect();

        for extraction in &extractions {
            for error in &extraction.errors {
                tracing::warn!(dialect = extraction.dialect, %error, "skipping malformed instruction");
                outcome.skipped.push(SkippedInstruction {
                    dialect: extraction.dialect,
                    excerpt: text[extraction.span.clone()].to_string(),
                    error: error.clone(),
                });
            }
            for command in &extraction.commands {
                apply_command(command, store, &mut outcome);
            }
        }

        // Markers resolve after every explicit command so "never set" covers the whole text
        let mut replacements = Vec::new();
        for extraction in &extractions {
            if let SpanAction::Initialize { referenced } = &extraction.action {
                let commands = self.initialize(referenced, &set_paths, store, &mut outcome);
                replacements.push(render_init(&commands));
            }
        }

        outcome.text = rebuild_text(text, &extractions, replacements);
        tracing::debug!(
            applied = outcome.applied.len(),
            initialized = outcome.initialized.len(),
            warnings = outcome.warnings.len(),
            skipped = outcome.skipped.len(),
            "processed generated text"
        );
        outcome
    }

    fn initialize(
        &self,
        referenced: &[String],
        set_paths: &HashSet<&str>,
        store: &mut VariableStore,
        outcome: &mut ProcessOutcome,
    ) -> Vec<MutationCommand> {
        let mut commands = Vec::new();
        for path in referenced {
            if set_paths.contains(path.as_str()) || store.has(Scope::Global, path) {
                continue;
            }
            let Ok(command) = MutationCommand::new(
                path,
                None,
                infer_default(path),
                Some(INIT_REASON.to_string()),
            ) else {
                continue;
            };
            if self.config.apply_init_commands && !outcome.initialized.iter().any(|c| c.path == *path) {
                store.set(Scope::Global, &command.path, command.new_value.clone());
                outcome.initialized.push(command.clone());
            }
            commands.push(command);
        }
        commands
    }
}

fn apply_command(command: &MutationCommand, store: &mut VariableStore, outcome: &mut ProcessOutcome) {
    let current = store.get(Scope::Global, &command.path).cloned();
    if let Some(expected) = &command.old_value {
        if !value::loosely_equal(expected, current.as_ref()) {
            tracing::warn!(
                path = %command.path,
                expected = %expected,
                actual = ?current,
                "old value mismatch; applying anyway"
            );
            outcome.warnings.push(ConsistencyWarning {
                path: command.path.clone(),
                expected: expected.clone(),
                actual: current,
            });
        }
    }

    if store.set(Scope::Global, &command.path, command.new_value.clone()) {
        outcome.applied.push(command.clone());
    } else {
        tracing::warn!(path = %command.path, "write blocked; skipping instruction");
        outcome.skipped.push(SkippedInstruction {
            dialect: "store",
            excerpt: command.path.clone(),
            error: CommandError::WriteBlocked(command.path.clone()),
        });
    }
}

fn render_init(commands: &[MutationCommand]) -> String {
    commands
        .iter()
        .map(|c| {
            format!(
                "set({}, null, {}, {});",
                render(&Value::from(c.path.as_str())),
                render(&c.new_value),
                render(&Value::from(INIT_REASON)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn rebuild_text(text: &str, extractions: &[Extraction], replacements: Vec<String>) -> String {
    let mut replacements = replacements.into_iter();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut removed_any = false;
    let mut trim_start = false;
    let mut trim_end = false;

    for extraction in extractions {
        match &extraction.action {
            SpanAction::Keep => continue,
            SpanAction::Remove => {
                if !removed_any {
                    trim_start = text[..extraction.span.start].trim().is_empty();
                }
                removed_any = true;
                trim_end = text[extraction.span.end..].trim().is_empty();
            }
            SpanAction::Initialize { .. } => trim_end = false,
        }
        out.push_str(&text[cursor..extraction.span.start]);
        if matches!(extraction.action, SpanAction::Initialize { .. }) {
            out.push_str(&replacements.next().unwrap_or_default());
        }
        cursor = extraction.span.end;
    }
    out.push_str(&text[cursor..]);

    if removed_any {
        // Only whitespace left behind at an edge by a removed span is trimmed.
        let collapsed = BLANK_RUNS.replace_all(&out, "\n\n");
        let mut cleaned: &str = &collapsed;
        if trim_start {
            cleaned = cleaned.trim_start();
        }
        if trim_end {
            cleaned = cleaned.trim_end();
        }
        cleaned.to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vbe_store::Operation;

    fn store_with(path: &str, value: Value) -> VariableStore {
        let mut store = VariableStore::new();
        store.set(Scope::Global, path, value);
        store.clear_history();
        store
    }

    #[test]
    fn call_form_scenario() {
        let mut store = store_with("affinity", json!(3));
        let outcome = CommandProcessor::default()
            .process("She accepts the flower. set('affinity', 3, 5, 'gift given')", &mut store);

        assert_eq!(store.get(Scope::Global, "affinity"), Some(&json!(5)));
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.text, "She accepts the flower.");
        assert!(!outcome.text.contains("set("));

        let record = &store.history()[0];
        assert_eq!(record.path, "affinity");
        assert_eq!(record.old_value, json!(3));
        assert_eq!(record.new_value, json!(5));
        assert_eq!(record.operation, Operation::Set);
    }

    #[test]
    fn inline_mismatch_scenario() {
        let mut store = VariableStore::new();
        let outcome = CommandProcessor::default().process("@mood=calm⇒anxious@", &mut store);

        assert_eq!(store.get(Scope::Global, "mood"), Some(&json!("anxious")));
        assert_eq!(
            outcome.warnings,
            vec![ConsistencyWarning {
                path: "mood".into(),
                expected: json!("calm"),
                actual: None,
            }]
        );
        assert_eq!(outcome.text, "");
    }

    #[test]
    fn commands_apply_in_text_order() {
        let mut store = VariableStore::new();
        CommandProcessor::default().process("@x=1@ set('x', 1, 2) @x=1⇒3@", &mut store);
        assert_eq!(store.get(Scope::Global, "x"), Some(&json!(3)));
        let values: Vec<_> = store.history().iter().map(|r| r.new_value.clone()).collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn block_removed_and_blank_lines_collapsed() {
        let mut store = VariableStore::new();
        let text = "Line one.\n\n<UpdateVariable>\n@a=1@\n</UpdateVariable>\n\nLine two.";
        let outcome = CommandProcessor::default().process(text, &mut store);
        assert_eq!(outcome.text, "Line one.\n\nLine two.");
        assert_eq!(outcome.applied.len(), 1);
    }

    #[test]
    fn malformed_instruction_kept_and_rest_processed() {
        let mut store = VariableStore::new();
        let outcome = CommandProcessor::default().process("set('a', 1) then @b=2@", &mut store);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].excerpt, "set('a', 1)");
        assert_eq!(store.get(Scope::Global, "b"), Some(&json!(2)));
        assert_eq!(outcome.text, "set('a', 1) then");
    }

    #[test]
    fn blocked_write_is_skipped() {
        let mut store = store_with("list", json!([1, 2]));
        let outcome = CommandProcessor::default().process("@list.name=x@", &mut store);
        assert!(outcome.applied.is_empty());
        assert_eq!(
            outcome.skipped[0].error,
            CommandError::WriteBlocked("list.name".into())
        );
    }

    #[test]
    fn init_marker_replaced_and_applied() {
        let mut store = store_with("existing", json!(1));
        let text = "HP {{getvar::hp}}, {{getvar::existing}}, {{getvar::world.time}}, {{getvar::mood}}\n|init-vars|\n@mood=calm@";
        let outcome = CommandProcessor::default().process(text, &mut store);

        let init_paths: Vec<_> = outcome.initialized.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(init_paths, vec!["hp", "world.time"]);
        assert_eq!(store.get(Scope::Global, "hp"), Some(&json!(0)));
        assert_eq!(store.get(Scope::Global, "world.time"), Some(&json!("morning")));
        assert_eq!(store.get(Scope::Global, "mood"), Some(&json!("calm")));

        assert!(outcome.text.contains("set('hp', null, 0, 'init');"));
        assert!(outcome.text.contains("set('world.time', null, 'morning', 'init');"));
        assert!(!outcome.text.contains("|init-vars|"));
        assert!(!outcome.text.contains("@mood"));
    }

    #[test]
    fn init_commands_can_be_render_only() {
        let mut store = VariableStore::new();
        let config = ParserConfig {
            apply_init_commands: false,
            ..ParserConfig::default()
        };
        let outcome = CommandProcessor::new(config).process("{{getvar::hp}} |init-vars|", &mut store);
        assert!(outcome.initialized.is_empty());
        assert!(!store.has(Scope::Global, "hp"));
        assert_eq!(outcome.text, "{{getvar::hp}} set('hp', null, 0, 'init');");
    }

    #[test]
    fn text_without_instructions_untouched() {
        let mut store = VariableStore::new();
        let text = "  Plain text.\n\n\n  Nothing here.  ";
        let outcome = CommandProcessor::default().process(text, &mut store);
        assert_eq!(outcome.text, text);
        assert!(!outcome.has_changes());
    }

    #[test]
    fn surrounding_whitespace_survives_inner_removal() {
        let mut store = VariableStore::new();
        let text = "    Indented opening.\n@a=1@\n    Indented close.\n";
        let outcome = CommandProcessor::default().process(text, &mut store);
        assert_eq!(outcome.text, "    Indented opening.\n\n    Indented close.\n");

        let outcome = CommandProcessor::default().process("  Lead. @b=2@", &mut store);
        assert_eq!(outcome.text, "  Lead.");

        let outcome = CommandProcessor::default().process("@c=3@\n  Tail stays.  ", &mut store);
        assert_eq!(outcome.text, "Tail stays.  ");
    }

    #[test]
    fn extract_is_read_only() {
        let commands = CommandProcessor::default().extract("@a=1@ set('b', 0, 2)");
        assert_eq!(commands.len(), 2);
    }
}
