//! VBE Engine
//!
//! Session facade over the variable store, command processor and snapshot
//! manager.
//!
//! # Core Concepts
//!
//! - [`VariableEngine`]: One session's live state and the operations on it
//! - [`EngineConfig`]: Snapshot policy, parser and ledger settings (TOML)
//! - [`SessionRegistry`]: Engines for several concurrent sessions
//!
//! # Example
//!
//! ```rust
//! use vbe_engine::VariableEngine;
//! use vbe_snapshot::VariableTree;
//! use serde_json::json;
//!
//! let mut engine = VariableEngine::default();
//! let mut tree = VariableTree::new();
//!
//! let shown = engine.apply_generated_text("The door creaks. @door=closed⇒open@");
//! assert_eq!(shown.text, "The door creaks.");
//! let root = engine.commit_node(&mut tree, "n0", None).unwrap();
//!
//! engine.apply_generated_text("@door=open⇒locked@");
//! engine.commit_node(&mut tree, "n1", Some(&root)).unwrap();
//!
//! engine.switch_to(&tree, &root).unwrap();
//! assert_eq!(engine.get("door"), Some(&json!("open")));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod config;
mod engine;
mod error;
mod session;

// Re-exports
pub use config::{ConfigError, EngineConfig, LedgerConfig};
pub use engine::{SearchHit, VariableEngine};
pub use error::EngineError;
pub use session::{SessionHandle, SessionId, SessionRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
