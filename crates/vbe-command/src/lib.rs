//! VBE Mutation Command Parser
//!
//! Turns model-generated text into variable mutations.
//!
//! # Core Concepts
//!
//! - [`MutationCommand`]: The one normalized instruction shape
//! - [`CommandDialect`]: A single extraction pass (call, inline, block, init)
//! - [`DialectRegistry`]: Priority-ordered set of passes
//! - [`CommandProcessor`]: Applies commands to a store and hides their syntax
//! - [`infer_default`]: Name-based default for uninitialized variables
//!
//! # Example
//!
//! ```rust
//! use vbe_command::CommandProcessor;
//! use vbe_store::{Scope, VariableStore};
//! use serde_json::json;
//!
//! let mut store = VariableStore::new();
//! let outcome = CommandProcessor::default()
//!     .process("She laughs. @mood=calm⇒happy@", &mut store);
//!
//! assert_eq!(outcome.text, "She laughs.");
//! assert_eq!(store.get(Scope::Global, "mood"), Some(&json!("happy")));
//! assert_eq!(outcome.warnings.len(), 1); // nothing was "calm" before
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod command;
pub mod dialects;
mod error;
pub mod infer;
pub mod literal;
mod processor;

// Re-exports
pub use command::{Extraction, MutationCommand, SpanAction};
pub use dialects::{default_dialects, CommandDialect, DialectRegistry, DEFAULT_BLOCK_TAG};
pub use error::CommandError;
pub use infer::{infer_default, InferenceRule, RULES};
pub use processor::{
    CommandProcessor, ConsistencyWarning, ParserConfig, ProcessOutcome, SkippedInstruction,
    INIT_REASON,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;
    use vbe_store::{Scope, VariableStore};

    /// A dialect added from outside the crate plugs into the same pipeline
    struct ShoutDialect;

    impl CommandDialect for ShoutDialect {
        fn name(&self) -> &'static str {
            "shout"
        }

        fn scan(&self, text: &str) -> Vec<Extraction> {
            text.match_indices("!!LOUD!!")
                .map(|(start, m)| {
                    let cmd = MutationCommand::new("volume", None, json!(11), None).unwrap();
                    Extraction::commands(start..start + m.len(), "shout", vec![cmd])
                })
                .collect()
        }
    }

    #[test]
    fn custom_dialect_composes() {
        let mut registry = default_dialects(DEFAULT_BLOCK_TAG);
        registry.register(ShoutDialect);
        let processor = CommandProcessor::with_registry(registry, ParserConfig::default());

        let mut store = VariableStore::new();
        let outcome = processor.process("Hey !!LOUD!! @a=1@", &mut store);
        assert_eq!(store.get(Scope::Global, "volume"), Some(&json!(11)));
        assert_eq!(store.get(Scope::Global, "a"), Some(&json!(1)));
        assert_eq!(outcome.text, "Hey");
    }

    #[test]
    fn mixed_dialects_full_pass() {
        let mut store = VariableStore::new();
        store.set(Scope::Global, "affinity", json!(3));

        let text = "\
The merchant nods.
<UpdateVariable>
_.set('affinity', 3, 4);//polite greeting
@world.time=morning⇒noon@
</UpdateVariable>
set('gold', 0, 10, 'sold sword') @inventory=['shield']@";

        let outcome = CommandProcessor::default().process(text, &mut store);
        assert_eq!(outcome.text, "The merchant nods.");
        assert_eq!(outcome.applied.len(), 4);
        assert_eq!(store.get(Scope::Global, "affinity"), Some(&json!(4)));
        assert_eq!(store.get(Scope::Global, "world.time"), Some(&json!("noon")));
        assert_eq!(store.get(Scope::Global, "gold"), Some(&json!(10)));
        assert_eq!(store.get(Scope::Global, "inventory"), Some(&json!(["shield"])));
        // world.time and gold had no prior value
        assert_eq!(outcome.warnings.len(), 2);
    }
}
